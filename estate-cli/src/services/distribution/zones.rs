//! Built-in zone table for the Ōita office
//!
//! Neighbourhood zones come before the city-wide ones so the most specific
//! label is listed first.

use super::ZoneRule;

const DEFAULT_ZONES: &[(&str, &str)] = &[
    // 大分市 central
    ("中央町", "大分市中心部"),
    ("府内町", "大分市中心部"),
    ("都町", "大分市中心部"),
    ("金池", "大分市中心部"),
    ("高崎", "高崎"),
    ("西大分", "高崎"),
    ("生石", "高崎"),
    // 大分市 east
    ("明野", "明野"),
    ("鶴崎", "鶴崎・大在"),
    ("大在", "鶴崎・大在"),
    ("坂ノ市", "坂ノ市"),
    // 大分市 south / west
    ("敷戸", "敷戸・判田"),
    ("判田", "敷戸・判田"),
    ("稙田", "稙田"),
    ("光吉", "稙田"),
    ("田尻", "稙田"),
    ("賀来", "賀来"),
    ("大分市", "大分市全域"),
    // neighbouring cities
    ("別府市", "別府市"),
    ("由布市", "由布市"),
    ("臼杵市", "臼杵・津久見"),
    ("津久見市", "臼杵・津久見"),
    ("佐伯市", "佐伯市"),
];

pub fn default_zone_rules() -> Vec<ZoneRule> {
    DEFAULT_ZONES
        .iter()
        .map(|(pattern, label)| ZoneRule::new(*pattern, *label))
        .collect()
}

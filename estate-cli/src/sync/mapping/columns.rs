//! Sheet column tables
//!
//! Each entry maps a sheet header (and the older header spellings still found
//! on some sheets) to a record field. Headers are compared with whitespace
//! removed, so "氏名 ・会社名" and "氏名・会社名" are the same column.

use crate::models::EntityType;

/// How a cell is normalized before it reaches the record
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldKind {
    Text,
    Date,
    /// Yen amount, `万` suffix allowed
    Amount,
    Decimal,
    /// Comma-separated list
    List,
    PropertyType,
    PropertyTypeList,
    /// Free-text status, trimmed
    Status,
}

#[derive(Debug, Clone, Copy)]
pub struct ColumnSpec {
    pub header: &'static str,
    pub aliases: &'static [&'static str],
    pub field: &'static str,
    pub kind: FieldKind,
}

const fn col(
    header: &'static str,
    aliases: &'static [&'static str],
    field: &'static str,
    kind: FieldKind,
) -> ColumnSpec {
    ColumnSpec {
        header,
        aliases,
        field,
        kind,
    }
}

pub const SELLER_COLUMNS: &[ColumnSpec] = &[
    col("名前(漢字のみ）", &["名前", "氏名"], "name", FieldKind::Text),
    col("物件所在地", &["物件住所"], "property_address", FieldKind::Text),
    col("電話番号", &["電話番号ハイフン不要", "電話"], "phone_number", FieldKind::Text),
    col("メールアドレス", &["メール"], "email", FieldKind::Text),
    col("種別", &["物件種別"], "property_type", FieldKind::PropertyType),
    col("状況（当社）", &["状況", "ステータス"], "status", FieldKind::Status),
    col("反響日付", &["反響日"], "inquiry_date", FieldKind::Date),
    col("訪問日", &["訪問日 Y/M/D"], "visit_date", FieldKind::Date),
    col("次電日", &[], "next_call_date", FieldKind::Date),
    col("査定額", &["査定額1"], "valuation_amount", FieldKind::Amount),
    col("営担", &["担当", "担当者"], "assignee", FieldKind::Text),
    col("コメント", &["備考"], "comments", FieldKind::Text),
    col("緯度", &[], "latitude", FieldKind::Decimal),
    col("経度", &[], "longitude", FieldKind::Decimal),
];

pub const BUYER_COLUMNS: &[ColumnSpec] = &[
    col("●氏名・会社名", &["氏名・会社名", "名前", "氏名"], "name", FieldKind::Text),
    col("●電話番号", &["電話番号"], "phone_number", FieldKind::Text),
    col("●メアド", &["メールアドレス", "メール"], "email", FieldKind::Text),
    col("受付日", &[], "reception_date", FieldKind::Date),
    col("★最新状況", &["最新状況"], "latest_status", FieldKind::Status),
    col("★エリア", &["希望エリア", "エリア"], "desired_areas", FieldKind::List),
    col("★希望種別", &["希望種別"], "desired_property_types", FieldKind::PropertyTypeList),
    col("★予算", &["予算"], "budget", FieldKind::Amount),
    col("★次電日", &["次電日"], "next_call_date", FieldKind::Date),
    col("物件番号", &["問合せ物件番号"], "inquiry_property_number", FieldKind::Text),
    col("後続担当", &["担当", "担当者"], "assignee", FieldKind::Text),
    col("●問合時ヒアリング", &["備考", "コメント"], "comments", FieldKind::Text),
];

pub const PROPERTY_COLUMNS: &[ColumnSpec] = &[
    col("種別", &["物件種別"], "property_type", FieldKind::PropertyType),
    col("所在地", &["住所", "物件所在地"], "address", FieldKind::Text),
    col("状況", &["ステータス", "atbb成約済み/非公開"], "status", FieldKind::Status),
    col("売買価格", &["価格"], "price", FieldKind::Amount),
    col("担当名（営業）", &["営業担当", "担当"], "sales_assignee", FieldKind::Text),
    col("売主番号", &[], "seller_number", FieldKind::Text),
    col("契約日", &["契約年月日"], "contract_date", FieldKind::Date),
    col("決済日", &["決済予定日"], "settlement_date", FieldKind::Date),
    col("緯度", &[], "latitude", FieldKind::Decimal),
    col("経度", &[], "longitude", FieldKind::Decimal),
];

/// Column table for an entity; the business number column is handled separately
pub fn columns_for(entity: EntityType) -> &'static [ColumnSpec] {
    match entity {
        EntityType::Seller => SELLER_COLUMNS,
        EntityType::Buyer => BUYER_COLUMNS,
        EntityType::Property => PROPERTY_COLUMNS,
    }
}

impl ColumnSpec {
    /// Header spellings in preference order
    pub fn headers(&self) -> impl Iterator<Item = &'static str> {
        std::iter::once(self.header).chain(self.aliases.iter().copied())
    }
}

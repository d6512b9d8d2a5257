// 📊 Export Column - one configured column of a CSV or PDF report
//
// Legacy databases stored the column kind as its display name ("Category Code").
// Current databases store the integer id of ColumnType.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

// ============================================================================
// COLUMN TYPE (receipt column definitions)
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ColumnType {
    Blank,
    CategoryCode,
    CategoryName,
    UserId,
    ReportName,
    ReportStartDate,
    ReportEndDate,
    ReportComment,
    ReportCostCenter,
    ImageFileName,
    ImagePath,
    Comment,
    Currency,
    Date,
    Name,
    Price,
    Tax,
    Pictured,
    Reimbursable,
    PaymentMethod,
    Index,
    Id,
}

impl ColumnType {
    pub const ALL: [ColumnType; 22] = [
        ColumnType::Blank,
        ColumnType::CategoryCode,
        ColumnType::CategoryName,
        ColumnType::UserId,
        ColumnType::ReportName,
        ColumnType::ReportStartDate,
        ColumnType::ReportEndDate,
        ColumnType::ReportComment,
        ColumnType::ReportCostCenter,
        ColumnType::ImageFileName,
        ColumnType::ImagePath,
        ColumnType::Comment,
        ColumnType::Currency,
        ColumnType::Date,
        ColumnType::Name,
        ColumnType::Price,
        ColumnType::Tax,
        ColumnType::Pictured,
        ColumnType::Reimbursable,
        ColumnType::PaymentMethod,
        ColumnType::Index,
        ColumnType::Id,
    ];

    /// Integer persisted in `column_type`; equals the position in `ALL`
    pub fn id(&self) -> i64 {
        *self as i64
    }

    pub fn from_id(id: i64) -> Option<ColumnType> {
        usize::try_from(id).ok().and_then(|i| Self::ALL.get(i).copied())
    }

    /// Name shown in column pickers and used by legacy rows
    pub fn display_name(&self) -> &'static str {
        match self {
            ColumnType::Blank => "Blank Column",
            ColumnType::CategoryCode => "Category Code",
            ColumnType::CategoryName => "Category Name",
            ColumnType::UserId => "User ID",
            ColumnType::ReportName => "Report Name",
            ColumnType::ReportStartDate => "Report Start Date",
            ColumnType::ReportEndDate => "Report End Date",
            ColumnType::ReportComment => "Report Comment",
            ColumnType::ReportCostCenter => "Report Cost Center",
            ColumnType::ImageFileName => "Image File Name",
            ColumnType::ImagePath => "Image Path",
            ColumnType::Comment => "Comment",
            ColumnType::Currency => "Currency",
            ColumnType::Date => "Date",
            ColumnType::Name => "Name",
            ColumnType::Price => "Price",
            ColumnType::Tax => "Tax",
            ColumnType::Pictured => "Pictured",
            ColumnType::Reimbursable => "Reimbursable",
            ColumnType::PaymentMethod => "Payment Method",
            ColumnType::Index => "Index",
            ColumnType::Id => "ID",
        }
    }

    /// Legacy rows were written by hand-edited settings, so match loosely
    pub fn from_legacy_name(name: &str) -> Option<ColumnType> {
        let wanted = name.trim();
        Self::ALL
            .iter()
            .copied()
            .find(|ct| ct.display_name().eq_ignore_ascii_case(wanted))
    }
}

// ============================================================================
// COLUMN
// ============================================================================

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Column {
    pub id: i64,
    pub column_type: ColumnType,
    pub custom_order_id: i64,
    pub uuid: Uuid,
}

impl Column {
    pub fn header(&self) -> &'static str {
        self.column_type.display_name()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ids_follow_catalog_order() {
        for (position, ct) in ColumnType::ALL.iter().enumerate() {
            assert_eq!(ct.id(), position as i64);
            assert_eq!(ColumnType::from_id(ct.id()), Some(*ct));
        }
        assert_eq!(ColumnType::from_id(-1), None);
        assert_eq!(ColumnType::from_id(99), None);
    }

    #[test]
    fn test_legacy_names_resolve() {
        assert_eq!(
            ColumnType::from_legacy_name("Category Code"),
            Some(ColumnType::CategoryCode)
        );
        assert_eq!(ColumnType::from_legacy_name(" price "), Some(ColumnType::Price));
        assert_eq!(ColumnType::from_legacy_name("Mileage"), None);
    }

    #[test]
    fn test_display_names_are_unique() {
        let mut names: Vec<&str> = ColumnType::ALL.iter().map(|c| c.display_name()).collect();
        names.sort();
        names.dedup();
        assert_eq!(names.len(), ColumnType::ALL.len());
    }
}

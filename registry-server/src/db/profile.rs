//! Per-type table mapping for ISBN and ISMN

use shared::models::IdentifierType;

/// Tables and publisher attribute backing one identifier type
#[derive(Debug)]
pub struct TypeProfile {
    pub identifier_type: IdentifierType,
    pub range_table: &'static str,
    pub sub_range_table: &'static str,
    pub canceled_sub_range_table: &'static str,
    /// Publisher column holding the active sub-range's publisher identifier
    pub publisher_active_column: &'static str,
}

static ISBN: TypeProfile = TypeProfile {
    identifier_type: IdentifierType::Isbn,
    range_table: "isbn_range",
    sub_range_table: "isbn_sub_range",
    canceled_sub_range_table: "isbn_canceled_sub_range",
    publisher_active_column: "active_identifier_isbn",
};

static ISMN: TypeProfile = TypeProfile {
    identifier_type: IdentifierType::Ismn,
    range_table: "ismn_range",
    sub_range_table: "ismn_sub_range",
    canceled_sub_range_table: "ismn_canceled_sub_range",
    publisher_active_column: "active_identifier_ismn",
};

impl TypeProfile {
    pub fn of(identifier_type: IdentifierType) -> &'static TypeProfile {
        match identifier_type {
            IdentifierType::Isbn => &ISBN,
            IdentifierType::Ismn => &ISMN,
        }
    }
}

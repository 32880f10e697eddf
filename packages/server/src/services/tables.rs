use common::DataType;

/// Physical storage of one data type: value table, entity link table and
/// default-value link table.
///
/// This is the only place where table identifiers used in raw SQL come from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PropertyTables {
    pub data_type: DataType,
    /// Short name used for lateral join aliases and result columns.
    pub prefix: &'static str,
    pub value_table: &'static str,
    pub link_table: &'static str,
    pub default_table: &'static str,
}

const BOOLEAN: PropertyTables = PropertyTables {
    data_type: DataType::Boolean,
    prefix: "boolean",
    value_table: "boolean_property_value",
    link_table: "entity_boolean_property",
    default_table: "property_config_default_boolean_value",
};

const INT: PropertyTables = PropertyTables {
    data_type: DataType::Int,
    prefix: "int",
    value_table: "int_property_value",
    link_table: "entity_int_property",
    default_table: "property_config_default_int_value",
};

const DATE: PropertyTables = PropertyTables {
    data_type: DataType::Date,
    prefix: "date",
    value_table: "date_property_value",
    link_table: "entity_date_property",
    default_table: "property_config_default_date_value",
};

const IMAGE: PropertyTables = PropertyTables {
    data_type: DataType::Image,
    prefix: "image",
    value_table: "image_property_value",
    link_table: "entity_image_property",
    default_table: "property_config_default_image_value",
};

const SHORT_TEXT: PropertyTables = PropertyTables {
    data_type: DataType::ShortText,
    prefix: "short_text",
    value_table: "short_text_property_value",
    link_table: "entity_short_text_property",
    default_table: "property_config_default_short_text_value",
};

const LONG_TEXT: PropertyTables = PropertyTables {
    data_type: DataType::LongText,
    prefix: "long_text",
    value_table: "long_text_property_value",
    link_table: "entity_long_text_property",
    default_table: "property_config_default_long_text_value",
};

impl PropertyTables {
    pub fn of(data_type: DataType) -> &'static PropertyTables {
        match data_type {
            DataType::Boolean => &BOOLEAN,
            DataType::Int => &INT,
            DataType::Date => &DATE,
            DataType::Image => &IMAGE,
            DataType::ShortText => &SHORT_TEXT,
            DataType::LongText => &LONG_TEXT,
        }
    }

    pub fn all() -> impl Iterator<Item = &'static PropertyTables> {
        DataType::ALL.iter().map(|dt| Self::of(*dt))
    }

    /// Value tables that take part in free-text matching.
    pub fn text() -> impl Iterator<Item = &'static PropertyTables> {
        Self::all().filter(|t| t.data_type.is_text())
    }

    /// JSONB expression rendering the value row aliased `alias`.
    pub fn value_json(&self, alias: &str) -> String {
        match self.data_type {
            DataType::Image => format!(
                "jsonb_build_object('src', {alias}.\"url\", 'alt', {alias}.\"alt_text\")"
            ),
            _ => format!("to_jsonb({alias}.\"value\")"),
        }
    }

    /// Scalar expression used when sorting by a property of this type.
    pub fn sort_expr(&self, alias: &str) -> String {
        match self.data_type {
            DataType::Image => format!("{alias}.\"alt_text\""),
            _ => format!("{alias}.\"value\""),
        }
    }

    /// Result column carrying the aggregated links of this type.
    pub fn values_column(&self) -> String {
        format!("{}_values", self.prefix)
    }
}

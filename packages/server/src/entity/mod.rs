pub mod entity_config;
pub mod entity_item;
pub mod entity_tag;
pub mod list_config;
pub mod property_config;
pub mod tag;

pub mod boolean_property_value;
pub mod date_property_value;
pub mod image_property_value;
pub mod int_property_value;
pub mod long_text_property_value;
pub mod short_text_property_value;

pub mod entity_boolean_property;
pub mod entity_date_property;
pub mod entity_image_property;
pub mod entity_int_property;
pub mod entity_long_text_property;
pub mod entity_short_text_property;

pub mod property_config_default_boolean_value;
pub mod property_config_default_date_value;
pub mod property_config_default_image_value;
pub mod property_config_default_int_value;
pub mod property_config_default_long_text_value;
pub mod property_config_default_short_text_value;

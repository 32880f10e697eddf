pub mod data_type;
pub mod list;

pub use data_type::{DataType, ParseDataTypeError};
pub use list::{
    ContextType, ContextUnit, CustomSortProperty, ListContext, ListFilter, ListSort,
    NativeSortProperty, SortDirection, SortProperty, TaggingFilter, TextMatch, TextRule,
    TimeFilter,
};

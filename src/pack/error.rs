use miette::Diagnostic;
use thiserror::Error;

/// Failure to decode a single marker record (one line of a text format or
/// one element of a markup file). The record is skipped and the error logged
/// with its position; the rest of the file still loads.
#[derive(Debug, Error, Diagnostic)]
pub enum PackError {
    #[error("expected at least {need} comma separated fields, got {got}")]
    #[diagnostic(code(terramap::io::short_line))]
    ShortLine { need: usize, got: usize },

    #[error("field {field} is not an integer: {value:?}")]
    #[diagnostic(code(terramap::io::bad_int))]
    BadInt {
        field: &'static str,
        value: String,
    },

    #[error("no ':' separating the icon from the coordinates")]
    #[diagnostic(code(terramap::io::no_icon_separator))]
    NoIconSeparator,

    #[error("marker element is missing the {0} attribute")]
    #[diagnostic(code(terramap::io::missing_attribute))]
    MissingAttribute(&'static str),
}

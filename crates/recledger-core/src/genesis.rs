//! Built-in seed set for the default opportunity schema.

use crate::record::Record;
use crate::schema::DEFAULT_FIELDS;

type Row = [&'static str; DEFAULT_FIELDS.len()];

/// Field values of each built-in record, in `DEFAULT_FIELDS` order.
const OPPORTUNITIES: &[Row] = &[
    ["1", "Siva", "Solution 1", "One", "$15,000", "$3000", "", "01/01/2021", "", ""],
    ["2", "Smith", "Solution 2", "Two", "$15,000", "$3000", "", "01/01/2021", "", ""],
    ["3", "Christo", "Solution 3", "Three", "$15,000", "$3000", "", "01/01/2021", "", ""],
    ["4", "Melanie", "Solution 4", "Four", "$15,000", "$3000", "", "01/01/2021", "", ""],
    ["5", "Yuvesh", "Solution 5", "Three", "$15,000", "$3000", "", "01/01/2021", "", ""],
    ["6", "Lymina", "Solution 6", "Four", "$15,000", "$3000", "", "01/01/2021", "", ""],
];

/// The six opportunity records `InitLedger` writes by default.
pub fn default_records() -> Vec<Record> {
    OPPORTUNITIES
        .iter()
        .map(|row| DEFAULT_FIELDS.iter().copied().zip(row.iter().copied()).collect::<Record>())
        .collect()
}

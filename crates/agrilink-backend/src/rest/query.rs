//! Row filters in the table API's query-string dialect (`col=eq.v`, `col=in.(a,b)`, `order=col.desc`).

use std::fmt::Display;

#[derive(Debug, Default, Clone, PartialEq)]
pub struct Query {
    pairs: Vec<(String, String)>,
}

impl Query {
    pub fn new() -> Self {
        Self::default()
    }

    /// Columns to return. Embedded relations use `rel(cols)`.
    pub fn select(mut self, columns: &str) -> Self {
        self.pairs.push(("select".into(), columns.into()));
        self
    }

    pub fn eq(mut self, column: &str, value: impl Display) -> Self {
        self.pairs.push((column.into(), format!("eq.{}", value)));
        self
    }

    pub fn is_in<T: Display>(mut self, column: &str, values: &[T]) -> Self {
        let list = values.iter().map(ToString::to_string).collect::<Vec<_>>().join(",");
        self.pairs.push((column.into(), format!("in.({})", list)));
        self
    }

    /// Add a sort key. Repeated calls become tie-breakers.
    pub fn order(mut self, column: &str, ascending: bool) -> Self {
        let key = format!("{}.{}", column, if ascending { "asc" } else { "desc" });
        match self.pairs.iter_mut().find(|(k, _)| k == "order") {
            Some((_, v)) => {
                v.push(',');
                v.push_str(&key);
            }
            None => self.pairs.push(("order".into(), key)),
        }
        self
    }

    pub fn pairs(&self) -> &[(String, String)] {
        &self.pairs
    }
}

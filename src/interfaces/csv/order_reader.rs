use crate::domain::customer::CustomerId;
use crate::domain::order::{OrderRequest, RequestedLine};
use crate::domain::product::ProductId;
use crate::error::OrderError;
use serde::Deserialize;
use std::collections::HashMap;
use std::io::Read;
use thiserror::Error;

/// One CSV row: a single product line belonging to the order named by `order`.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct OrderRow {
    pub order: String,
    pub customer: CustomerId,
    pub product: ProductId,
    pub quantity: u32,
}

#[derive(Error, Debug)]
pub enum RowError {
    #[error("line {line}: {source}")]
    Malformed {
        line: u64,
        order: Option<String>,
        #[source]
        source: csv::Error,
    },
    #[error("line {line}: order {order} already belongs to customer {expected}, got {found}")]
    CustomerMismatch {
        line: u64,
        order: String,
        expected: CustomerId,
        found: CustomerId,
    },
}

impl RowError {
    pub fn line(&self) -> u64 {
        match self {
            Self::Malformed { line, .. } | Self::CustomerMismatch { line, .. } => *line,
        }
    }

    /// The order reference of the offending row, when it could be read.
    pub fn order(&self) -> Option<&str> {
        match self {
            Self::Malformed { order, .. } => order.as_deref(),
            Self::CustomerMismatch { order, .. } => Some(order),
        }
    }
}

/// A grouped order, or the lines that kept it from being read in full.
#[derive(Debug, Clone, PartialEq)]
pub enum ParsedRequest {
    Complete(OrderRequest),
    /// At least one row of the order was unreadable, so none of it is placed.
    Incomplete { bad_lines: Vec<u64> },
}

impl ParsedRequest {
    pub fn into_request(self) -> Result<OrderRequest, OrderError> {
        match self {
            Self::Complete(request) => Ok(request),
            Self::Incomplete { bad_lines } => {
                let lines: Vec<String> = bad_lines.iter().map(u64::to_string).collect();
                Err(OrderError::InvalidRequest(format!(
                    "unreadable input on line(s) {}",
                    lines.join(" ")
                )))
            }
        }
    }
}

/// An order request together with the reference it was given in the input.
#[derive(Debug, Clone, PartialEq)]
pub struct NamedRequest {
    pub reference: String,
    pub request: ParsedRequest,
}

struct Pending {
    reference: String,
    customer: Option<CustomerId>,
    lines: Vec<RequestedLine>,
    bad_lines: Vec<u64>,
}

impl Pending {
    fn finish(self) -> NamedRequest {
        let request = match self.customer {
            Some(customer) if self.bad_lines.is_empty() => {
                ParsedRequest::Complete(OrderRequest::new(customer, self.lines))
            }
            _ => ParsedRequest::Incomplete {
                bad_lines: self.bad_lines,
            },
        };
        NamedRequest {
            reference: self.reference,
            request,
        }
    }
}

/// Reads order lines from a CSV source with the header
/// `order,customer,product,quantity`.
///
/// Rows are grouped into one request per `order` reference, in the order each
/// reference first appears. Whitespace is trimmed and short rows are tolerated
/// so they can be reported instead of aborting the whole read.
pub struct OrderReader<R: Read> {
    reader: csv::Reader<R>,
}

impl<R: Read> OrderReader<R> {
    pub fn new(source: R) -> Self {
        let reader = csv::ReaderBuilder::new()
            .trim(csv::Trim::All)
            .flexible(true)
            .from_reader(source);
        Self { reader }
    }

    /// Lazily deserializes rows. Errors carry the input line number.
    pub fn rows(self) -> impl Iterator<Item = Result<OrderRow, RowError>> {
        self.numbered_rows().map(|row| row.map(|(_, row)| row))
    }

    fn numbered_rows(mut self) -> impl Iterator<Item = Result<(u64, OrderRow), RowError>> {
        let headers = self.reader.headers().ok().cloned();
        self.reader
            .into_records()
            .enumerate()
            .map(move |(idx, record)| -> Result<(u64, OrderRow), RowError> {
                let fallback = idx as u64 + 2;
                let record = record.map_err(|source| RowError::Malformed {
                    line: source
                        .position()
                        .map(|p| p.line())
                        .unwrap_or(fallback),
                    order: None,
                    source,
                })?;
                let line = record.position().map(|p| p.line()).unwrap_or(fallback);
                record
                    .deserialize::<OrderRow>(headers.as_ref())
                    .map(|row| (line, row))
                    .map_err(|source| RowError::Malformed {
                        line,
                        order: record
                            .get(0)
                            .filter(|order| !order.is_empty())
                            .map(str::to_owned),
                        source,
                    })
            })
    }

    /// Groups every row into requests, returning the rows that had to be skipped.
    ///
    /// A reference with any skipped row comes back as
    /// [`ParsedRequest::Incomplete`] rather than as a request missing lines.
    pub fn requests(self) -> (Vec<NamedRequest>, Vec<RowError>) {
        let mut pending: Vec<Pending> = Vec::new();
        let mut index: HashMap<String, usize> = HashMap::new();
        let mut skipped = Vec::new();

        let mut slot = |reference: &str, pending: &mut Vec<Pending>| -> usize {
            *index.entry(reference.to_owned()).or_insert_with(|| {
                pending.push(Pending {
                    reference: reference.to_owned(),
                    customer: None,
                    lines: Vec::new(),
                    bad_lines: Vec::new(),
                });
                pending.len() - 1
            })
        };

        for row in self.numbered_rows() {
            match row {
                Ok((line, row)) => {
                    let pos = slot(&row.order, &mut pending);
                    let entry = &mut pending[pos];
                    match entry.customer {
                        Some(expected) if expected != row.customer => {
                            entry.bad_lines.push(line);
                            skipped.push(RowError::CustomerMismatch {
                                line,
                                order: row.order,
                                expected,
                                found: row.customer,
                            });
                        }
                        _ => {
                            entry.customer = Some(row.customer);
                            entry
                                .lines
                                .push(RequestedLine::new(row.product, row.quantity));
                        }
                    }
                }
                Err(e) => {
                    if let Some(order) = e.order() {
                        let pos = slot(order, &mut pending);
                        pending[pos].bad_lines.push(e.line());
                    }
                    skipped.push(e);
                }
            }
        }

        (pending.into_iter().map(Pending::finish).collect(), skipped)
    }
}

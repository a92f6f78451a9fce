use serde::{Deserialize, Serialize};
use std::io;
use std::path::Path;
use thiserror::Error;

use crate::{AccountMetrics, Request, TradeOrder, TransactionKind, TransactionRecord};

/// Errors that can occur when parsing csv rows
#[derive(Debug, Error)]
pub enum CsvError {
    #[error("failed to open {path}: {source}")]
    Open { path: String, source: csv::Error },

    #[error("line {line}: failed to parse row: {source}")]
    Parse { line: usize, source: csv::Error },

    #[error("line {line}: unrecognized request type '{request_type}'")]
    UnrecognizedType { line: usize, request_type: String },

    #[error("line {line}: {request_type} missing {field}")]
    MissingField {
        line: usize,
        request_type: String,
        field: &'static str,
    },
}

#[derive(Debug, Deserialize)]
struct InputRow {
    r#type: String,
    account: String,
    counterparty: Option<String>,
    amount: Option<f64>,
    generated: Option<f64>,
    consumed: Option<f64>,
    name: Option<String>,
    rate: Option<f64>,
}

#[derive(Debug, Serialize)]
struct OutputRow<'a> {
    account: &'a str,
    name: &'a str,
    generated: String,
    consumed: String,
    credits: String,
    surplus: String,
    deficit: String,
    efficiency: String,
    self_sufficiency: String,
    carbon_offset: String,
}

fn fixed(value: f64) -> String {
    format!("{value:.4}")
}

impl InputRow {
    fn require<T>(value: Option<T>, line: usize, request_type: &str, field: &'static str) -> Result<T, CsvError> {
        value.ok_or_else(|| CsvError::MissingField {
            line,
            request_type: request_type.to_string(),
            field,
        })
    }

    fn into_request(self, line: usize) -> Result<Request, CsvError> {
        match self.r#type.as_str() {
            "register" => Ok(Request::Register {
                name: Self::require(self.name, line, "register", "name")?,
                account: self.account,
                generated: self.generated.unwrap_or(0.0),
                consumed: self.consumed.unwrap_or(0.0),
            }),
            "update" => Ok(Request::UpdateEnergy {
                account: self.account,
                generated: self.generated,
                consumed: self.consumed,
            }),
            "credit" => Ok(Request::AddCredits {
                amount: Self::require(self.amount, line, "credit", "amount")?,
                account: self.account,
            }),
            "redeem" => Ok(Request::RedeemCredits {
                amount: Self::require(self.amount, line, "redeem", "amount")?,
                account: self.account,
            }),
            other => {
                let kind: TransactionKind = other.parse().map_err(|_| CsvError::UnrecognizedType {
                    line,
                    request_type: other.to_string(),
                })?;
                Ok(Request::Trade(TradeOrder {
                    kind,
                    amount: Self::require(self.amount, line, kind.as_str(), "amount")?,
                    from: self.account,
                    to: self.counterparty,
                    rate: self.rate,
                }))
            }
        }
    }
}

/// Read requests from a csv file
pub fn read_requests(
    path: impl AsRef<Path>,
) -> Result<impl Iterator<Item = Result<Request, CsvError>>, CsvError> {
    let path = path.as_ref();
    let reader = csv::ReaderBuilder::new()
        .trim(csv::Trim::All)
        .flexible(true)
        .from_path(path)
        .map_err(|source| CsvError::Open {
            path: path.display().to_string(),
            source,
        })?;

    Ok(reader
        .into_deserialize::<InputRow>()
        .enumerate()
        .map(|(idx, result)| {
            let line = idx + 2; // 1-indexed, skip header
            let row = result.map_err(|source| CsvError::Parse { line, source })?;
            row.into_request(line)
        }))
}

/// Write account metrics in csv format
pub fn write_metrics<'a, W: io::Write>(
    writer: W,
    metrics: impl IntoIterator<Item = &'a AccountMetrics>,
) -> Result<(), csv::Error> {
    let mut writer = csv::Writer::from_writer(writer);

    for m in metrics {
        writer.serialize(OutputRow {
            account: &m.account,
            name: &m.name,
            generated: fixed(m.generated),
            consumed: fixed(m.consumed),
            credits: fixed(m.credits),
            surplus: fixed(m.surplus),
            deficit: fixed(m.deficit),
            efficiency: fixed(m.efficiency),
            self_sufficiency: fixed(m.self_sufficiency),
            carbon_offset: fixed(m.carbon_offset),
        })?;
    }

    writer.flush()?;
    Ok(())
}

/// Write settled transactions in csv format, one row per record
pub fn write_records<'a, W: io::Write>(
    writer: W,
    records: impl IntoIterator<Item = &'a TransactionRecord>,
) -> Result<(), csv::Error> {
    let mut writer = csv::Writer::from_writer(writer);

    for record in records {
        writer.serialize(record)?;
    }

    writer.flush()?;
    Ok(())
}

/// Read transactions written by [`write_records`]
pub fn read_records<R: io::Read>(reader: R) -> impl Iterator<Item = Result<TransactionRecord, csv::Error>> {
    csv::Reader::from_reader(reader).into_deserialize()
}

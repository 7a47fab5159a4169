// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2025 Daniel Negri
//
// This program is free software: you can redistribute it and/or modify
// it under the terms of the GNU Affero General Public License as published by
// the Free Software Foundation, either version 3 of the License, or
// (at your option) any later version.
//
// This program is distributed in the hope that it will be useful,
// but WITHOUT ANY WARRANTY; without even the implied warranty of
// MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE. See the
// GNU Affero General Public License for more details.
//
// You should have received a copy of the GNU Affero General Public License
// along with this program. If not, see <https://www.gnu.org/licenses/>.

use clap::Parser;
use csv::{ReaderBuilder, Trim, Writer};
use point_ledger_rs::{PointEngine, TransactionKind, UserId, UserPoint};
use serde::Deserialize;
use std::fs::File;
use std::io::{BufReader, Read, Write};
use std::path::PathBuf;
use std::process;
use tracing::warn;
use tracing_subscriber::EnvFilter;

/// Point Ledger - Apply point charges and uses from a CSV file
///
/// Reads operations from a CSV file and writes the resulting balances (or the
/// full ledger) to stdout. Logging is controlled by `RUST_LOG`.
#[derive(Parser, Debug)]
#[command(name = "point-ledger-rs")]
#[command(about = "Applies point charge/use operations from a CSV", long_about = None)]
struct Args {
    /// Path to CSV file with operations
    ///
    /// Expected format: type,user,amount
    /// Example: cargo run -- operations.csv > balances.csv
    #[arg(value_name = "FILE")]
    input: PathBuf,

    /// Print every ledger entry instead of the final balances
    #[arg(long)]
    history: bool,
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .init();

    let args = Args::parse();

    let file = match File::open(&args.input) {
        Ok(f) => f,
        Err(e) => {
            eprintln!("Error opening file '{}': {}", args.input.display(), e);
            process::exit(1);
        }
    };

    let engine = match process_operations(BufReader::new(file)) {
        Ok(engine) => engine,
        Err(e) => {
            eprintln!("Error processing operations: {}", e);
            process::exit(1);
        }
    };

    let result = if args.history {
        write_history(&engine, std::io::stdout())
    } else {
        write_balances(&engine, std::io::stdout())
    };
    if let Err(e) = result {
        eprintln!("Error writing output: {}", e);
        process::exit(1);
    }
}

/// Raw CSV record matching the input format.
///
/// Fields: `type, user, amount`
#[derive(Debug, Deserialize)]
struct CsvRecord {
    #[serde(rename = "type")]
    kind: String,
    user: i64,
    amount: i64,
}

/// Apply operations from a CSV reader to a fresh engine.
///
/// Rows are applied in file order. Malformed rows, unknown operation types and
/// rejected operations are skipped with a warning.
///
/// # CSV Format
///
/// ```csv
/// type,user,amount
/// charge,1,5000
/// use,1,1200
/// ```
///
/// # Errors
///
/// Returns a CSV error if the underlying reader fails.
pub fn process_operations<R: Read>(reader: R) -> Result<PointEngine, csv::Error> {
    let engine = PointEngine::new();

    let mut rdr = ReaderBuilder::new()
        .trim(Trim::All)
        .has_headers(true)
        .from_reader(reader);

    for (line, result) in rdr.deserialize::<CsvRecord>().enumerate() {
        let record = match result {
            Ok(record) => record,
            Err(e) if e.is_io_error() => return Err(e),
            Err(e) => {
                warn!(row = line + 1, "skipping malformed row: {e}");
                continue;
            }
        };

        let kind = match record.kind.parse::<TransactionKind>() {
            Ok(kind) => kind,
            Err(e) => {
                warn!(row = line + 1, "skipping row: {e}");
                continue;
            }
        };

        let user_id = UserId(record.user);
        let outcome = match kind {
            TransactionKind::Charge => engine.charge(user_id, record.amount),
            TransactionKind::Use => engine.use_points(user_id, record.amount),
        };
        if let Err(e) = outcome {
            warn!(row = line + 1, user = %user_id, %kind, code = e.code(), "skipping row: {e}");
        }
    }

    Ok(engine)
}

/// Balances sorted by user id.
fn sorted_balances(engine: &PointEngine) -> Vec<UserPoint> {
    let mut balances: Vec<UserPoint> = engine.balances().collect();
    balances.sort_by_key(|user_point| user_point.id);
    balances
}

/// Write one row per user.
///
/// Columns: `id, point, updated_at`
pub fn write_balances<W: Write>(engine: &PointEngine, writer: W) -> Result<(), csv::Error> {
    let mut wtr = Writer::from_writer(writer);
    for user_point in sorted_balances(engine) {
        wtr.serialize(user_point)?;
    }
    wtr.flush()?;
    Ok(())
}

/// Write every ledger entry, grouped by user and in ledger order.
///
/// Columns: `id, user_id, point, kind, timestamp`
pub fn write_history<W: Write>(engine: &PointEngine, writer: W) -> Result<(), csv::Error> {
    let mut wtr = Writer::from_writer(writer);
    for user_point in sorted_balances(engine) {
        for entry in engine.history(user_point.id) {
            wtr.serialize(entry)?;
        }
    }
    wtr.flush()?;
    Ok(())
}

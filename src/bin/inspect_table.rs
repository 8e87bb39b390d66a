use std::{env, process::exit};
use tabload::{EtlError, SqliteStore};

const DEFAULT_ROWS: usize = 10;

fn main() {
    // <DB_FILE> [TABLE] [ROWS]; without a table, list the tables.
    let args: Vec<String> = env::args().collect();
    if args.len() < 2 || args.len() > 4 {
        eprintln!("Usage: {} <DB_FILE> [TABLE] [ROWS]", args[0]);
        exit(1);
    }
    let store = SqliteStore::new(&args[1]);
    let rows = match args.get(3).map(|n| n.parse::<usize>()) {
        None => DEFAULT_ROWS,
        Some(Ok(n)) => n,
        Some(Err(e)) => {
            eprintln!("Error: invalid row count: {}", e);
            exit(1);
        }
    };

    let res = match args.get(2) {
        Some(table) => inspect_table(&store, table, rows),
        None => list_tables(&store),
    };
    if let Err(e) = res {
        eprintln!("Error: {}", e);
        exit(1);
    }
}

fn list_tables(store: &SqliteStore) -> Result<(), EtlError> {
    println!("=== Tables in {} ===", store.path().display());
    for name in store.tables()? {
        let ds = store.read_table(&name)?;
        println!("- {:<30} | {} rows", name, ds.num_rows());
    }
    Ok(())
}

/// Print the column schema and the first `limit` rows of `table`.
fn inspect_table(store: &SqliteStore, table: &str, limit: usize) -> Result<(), EtlError> {
    let ds = store.read_table(table)?;

    println!("=== Table: {} ({}) ===", table, store.path().display());
    println!("Rows:    {}", ds.num_rows());
    println!("Columns: {}", ds.num_columns());
    println!();

    println!("=== Schema ===");
    for col in ds.columns() {
        println!(
            "- {:<30} | {:<7} | missing: {}",
            col.name,
            col.ty.sql_type(),
            col.missing_count()
        );
    }
    println!();

    println!("=== First {} rows ===", limit.min(ds.num_rows()));
    println!("{}", ds.column_names().join(" | "));
    for r in 0..limit.min(ds.num_rows()) {
        let cells: Vec<String> = ds.row(r).iter().map(|v| v.to_string()).collect();
        println!("{}", cells.join(" | "));
    }
    Ok(())
}

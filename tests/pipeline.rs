use anyhow::Result;
use reqwest::Client;
use std::fs;
use tabload::{pipeline, Config, EtlError, SemanticType, SqliteStore, Step, Value};
use tempfile::tempdir;
use tracing_subscriber::{fmt, EnvFilter};

fn init_logging() {
    let _ = fmt::Subscriber::builder()
        .with_env_filter(EnvFilter::new("debug"))
        .with_test_writer()
        .try_init();
}

#[test]
fn shipped_config_is_valid() -> Result<()> {
    let config = Config::from_path(concat!(env!("CARGO_MANIFEST_DIR"), "/datasets.yaml"))?;
    let names: Vec<&str> = config.datasets.iter().map(|d| d.name.as_str()).collect();
    assert_eq!(
        names,
        vec![
            "airports",
            "cars",
            "stops",
            "personality",
            "worldhappiness",
            "wetterdata",
            "geode"
        ]
    );

    let geode = config.dataset("geode").unwrap();
    assert_eq!(geode.table_name(), "geode");
    assert_eq!(
        geode.store(&config.database).path(),
        std::path::Path::new("data/projectdb.db")
    );
    assert_eq!(
        config.dataset("wetterdata").unwrap().store(&config.database).path(),
        geode.store(&config.database).path()
    );

    let cars = config.dataset("cars").unwrap();
    assert_eq!(cars.source.encoding, "ISO-8859-1");
    assert!(!cars.source.header);
    assert!(matches!(cars.steps.last(), Some(Step::DropIncomplete)));

    let personality = config.dataset("personality").unwrap();
    assert_eq!(personality.source.delimiter, '\t');
    assert!(personality
        .steps
        .iter()
        .any(|s| matches!(s, Step::Aggregate(a) if a.min_count == 20)));
    Ok(())
}

/// A GENESIS-style export: preamble, headerless `;` rows in Latin-1, footer.
fn genesis_export() -> Vec<u8> {
    let cells = |date: &str, cin: &str, name: &[u8], base: u32| {
        let mut line = Vec::new();
        line.extend_from_slice(date.as_bytes());
        line.push(b';');
        line.extend_from_slice(cin.as_bytes());
        line.push(b';');
        line.extend_from_slice(name);
        for i in 3..=72 {
            line.push(b';');
            if i % 10 == 2 {
                line.extend_from_slice((base + i).to_string().as_bytes());
            } else {
                line.push(b'x');
            }
        }
        line.push(b'\n');
        line
    };

    let mut raw = Vec::new();
    for l in 0..7 {
        raw.extend_from_slice(format!("preamble line {l}\n").as_bytes());
    }
    raw.extend(cells("01.01.2023", "09162", b"M\xfcnchen, Landeshauptstadt", 1000));
    raw.extend(cells("01.01.2023", "09", b"Bayern", 2000));
    raw.extend(cells("01.01.2023", "09161", b"Ingolstadt", 3000));
    let mut dashes = cells("01.01.2023", "09163", b"Rosenheim", 0);
    // "-" marks a suppressed value
    let pos = dashes.iter().rposition(|&b| b == b';').unwrap();
    dashes.truncate(pos + 1);
    dashes.extend_from_slice(b"-\n");
    raw.extend(dashes);
    for l in 0..4 {
        raw.extend_from_slice(format!("footer {l}\n").as_bytes());
    }
    raw
}

#[tokio::test]
async fn headerless_latin1_export_to_sqlite() -> Result<()> {
    init_logging();
    let dir = tempdir()?;
    let csv = dir.path().join("46251-0021_00.csv");
    fs::write(&csv, genesis_export())?;

    let yaml = format!(
        r#"
database: {db}
datasets:
  - name: cars
    source:
      location: {csv}
      delimiter: ";"
      encoding: ISO-8859-1
      header: false
      skip_rows: 7
      skip_footer: 4
    steps:
      - columns:
          - {{source: 0, name: date}}
          - {{source: 1, name: CIN}}
          - {{source: 2, name: name}}
          - {{source: 12, name: petrol, type: integer}}
          - {{source: 72, name: others, type: integer}}
      - filter:
          - length: {{column: CIN, len: 5}}
      - drop_incomplete
"#,
        db = dir.path().join("cars.sqlite").display(),
        csv = csv.display(),
    );
    let config = Config::from_yaml_str(&yaml)?;

    let results = pipeline::run_all(&Client::new(), &config, &[]).await;
    let outcome = results[0].1.as_ref().map_err(|e| anyhow::anyhow!("{e}"))?;
    assert_eq!(outcome.table, "cars");
    assert_eq!(outcome.rows, 2);

    let back = SqliteStore::new(&config.database).read_table("cars")?;
    assert_eq!(
        back.column_names(),
        vec!["date", "CIN", "name", "petrol", "others"]
    );
    assert_eq!(back.column("petrol").unwrap().ty, SemanticType::Integer);
    assert_eq!(
        back.column("name").unwrap().values,
        vec![
            Value::from("München, Landeshauptstadt"),
            Value::from("Ingolstadt")
        ]
    );
    assert_eq!(
        back.column("others").unwrap().values,
        vec![Value::Integer(1072), Value::Integer(3072)]
    );
    Ok(())
}

#[tokio::test]
async fn rerun_replaces_table() -> Result<()> {
    init_logging();
    let dir = tempdir()?;
    let csv = dir.path().join("airports.csv");
    let yaml = format!(
        "database: {db}\ndatasets:\n  - name: airports\n    source: {{location: {csv}, delimiter: ';'}}\n",
        db = dir.path().join("airports.sqlite").display(),
        csv = csv.display(),
    );
    let config = Config::from_yaml_str(&yaml)?;
    let store = SqliteStore::new(&config.database);

    fs::write(&csv, "column_1;column_2\n1;Frankfurt\n2;Hahn\n")?;
    pipeline::run_dataset(&Client::new(), &config.datasets[0], &config.database).await?;
    assert_eq!(store.read_table("airports")?.num_rows(), 2);

    fs::write(&csv, "column_1;column_2\n3;Kassel\n")?;
    pipeline::run_dataset(&Client::new(), &config.datasets[0], &config.database).await?;
    let back = store.read_table("airports")?;
    assert_eq!(back.num_rows(), 1);
    assert_eq!(back.row(0)[1], &Value::from("Kassel"));
    Ok(())
}

#[tokio::test]
async fn schema_mismatch_aborts_before_persist() -> Result<()> {
    let dir = tempdir()?;
    let csv = dir.path().join("stops.txt");
    fs::write(&csv, "stop_id,stop_name\n1,Fulda\n")?;
    let yaml = format!(
        "database: {db}\ndatasets:\n  - name: stops\n    source: {{location: {csv}}}\n    steps:\n      - select: [stop_id, zone_id]\n",
        db = dir.path().join("gtfs.sqlite").display(),
        csv = csv.display(),
    );
    let config = Config::from_yaml_str(&yaml)?;
    let res = pipeline::run_dataset(&Client::new(), &config.datasets[0], &config.database).await;
    assert!(matches!(res, Err(EtlError::SchemaMismatch(_))));
    assert!(!config.database.exists());
    Ok(())
}

#[tokio::test]
async fn shipped_geode_steps_type_the_city_table() -> Result<()> {
    init_logging();
    let dir = tempdir()?;
    let csv = dir.path().join("de.csv");
    fs::write(
        &csv,
        "city,lat,lng,country,iso2,admin_name,capital,population,population_proper\n\
         Berlin,52.5200,13.4050,Germany,DE,Berlin,primary,3644826,3644826\n\
         Fulda,50.5528,9.6778,Germany,DE,Hesse,minor,68635,\n",
    )?;

    let config = Config::from_path(concat!(env!("CARGO_MANIFEST_DIR"), "/datasets.yaml"))?;
    let mut geode = config.dataset("geode").unwrap().clone();
    geode.source.location = csv.display().to_string();
    geode.database = Some(dir.path().join("projectdb.db"));

    let outcome = pipeline::run_dataset(&Client::new(), &geode, &config.database).await?;
    assert_eq!(outcome.rows, 2);

    let back = SqliteStore::new(dir.path().join("projectdb.db")).read_table("geode")?;
    assert_eq!(
        back.column_names(),
        vec![
            "city",
            "latitude",
            "longitude",
            "country",
            "iso2",
            "admin_name",
            "capital",
            "population",
            "population_proper"
        ]
    );
    assert_eq!(back.column("latitude").unwrap().ty, SemanticType::Float);
    assert_eq!(back.row(0)[7], &Value::Integer(3644826));
    assert_eq!(back.row(1)[6], &Value::from("minor"));
    assert_eq!(back.row(1)[8], &Value::Missing);
    Ok(())
}

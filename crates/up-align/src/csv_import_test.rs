use super::*;
use crate::test_support::RecordingDb;

const PRODUCTS: &str = "\"ID\",'CODE',descr,price,active\n\
                        1,A01,First,10,true\n\
                        2,A02,,12.5,false\n\
                        3,A03,Third,7,1\n";

fn products_db() -> RecordingDb {
    RecordingDb::new(
        "CREATE TABLE products (id INTEGER, code VARCHAR, descr VARCHAR, price DOUBLE, active BOOLEAN)",
    )
}

fn import(db: &RecordingDb, key: Option<&str>, csv: &str) -> AlignResult<CsvImportReport> {
    import_csv_reader(db, "products", key, csv.as_bytes(), "products.csv")
}

#[test]
fn test_second_import_updates_instead_of_duplicating() {
    let db = products_db();
    let first = import(&db, Some("id"), PRODUCTS).unwrap();
    assert_eq!(
        first,
        CsvImportReport {
            inserted: 3,
            updated: 0,
            skipped: 0
        }
    );

    let second = import(&db, Some("ID"), PRODUCTS).unwrap();
    assert_eq!(second.inserted, 0);
    assert_eq!(second.updated, 3);

    assert_eq!(
        db.column("SELECT CAST(COUNT(*) AS VARCHAR) FROM products"),
        vec![Some("3".to_string())]
    );
}

#[test]
fn test_update_changes_existing_rows() {
    let db = products_db();
    import(&db, Some("id"), PRODUCTS).unwrap();
    import(
        &db,
        Some("id"),
        "id,code,descr,price,active\n2,B02,Second,13,true\n4,A04,Fourth,1,false\n",
    )
    .unwrap();

    assert_eq!(
        db.column("SELECT code FROM products ORDER BY id"),
        vec![
            Some("A01".to_string()),
            Some("B02".to_string()),
            Some("A03".to_string()),
            Some("A04".to_string())
        ]
    );
}

#[test]
fn test_without_key_every_row_is_inserted() {
    let db = products_db();
    import(&db, None, PRODUCTS).unwrap();
    let report = import(&db, None, PRODUCTS).unwrap();
    assert_eq!(report.inserted, 3);
    assert_eq!(
        db.column("SELECT CAST(COUNT(*) AS VARCHAR) FROM products"),
        vec![Some("6".to_string())]
    );
}

#[test]
fn test_unknown_key_column_inserts() {
    let db = products_db();
    let report = import(&db, Some("sku"), PRODUCTS).unwrap();
    assert_eq!(report.inserted, 3);
}

#[test]
fn test_blank_fields_are_null() {
    let db = products_db();
    import(&db, Some("id"), PRODUCTS).unwrap();
    assert_eq!(
        db.column("SELECT descr FROM products WHERE id = 2"),
        vec![None]
    );
}

#[test]
fn test_short_rows_are_skipped() {
    let db = products_db();
    let report = import(
        &db,
        Some("id"),
        "id,code,descr,price,active\n1,A01,First,10,true\n2,A02\n3,A03,Third,7,1\n",
    )
    .unwrap();
    assert_eq!(report.inserted, 2);
    assert_eq!(report.skipped, 1);
}

#[test]
fn test_invalid_utf8_row_does_not_stop_import() {
    let db = RecordingDb::new("CREATE TABLE codes (id INTEGER, code VARCHAR)");
    let csv: &[u8] = b"id,code\n1,A\n2,\xff\xfe\n3,C\n";
    let report = import_csv_reader(&db, "codes", Some("id"), csv, "codes.csv").unwrap();
    assert_eq!(report.inserted, 3);
    assert_eq!(
        db.column("SELECT code FROM codes ORDER BY id"),
        vec![
            Some("A".to_string()),
            Some("\u{fffd}\u{fffd}".to_string()),
            Some("C".to_string())
        ]
    );
}

#[test]
fn test_missing_table_is_fatal() {
    let db = RecordingDb::new("");
    let err = import(&db, Some("id"), PRODUCTS).unwrap_err();
    assert!(matches!(err, AlignError::Db(DbError::TableNotFound(_))));
}

#[test]
fn test_malformed_header() {
    let db = products_db();
    let err = import(&db, None, "id,,descr\n1,2,3\n").unwrap_err();
    assert!(matches!(err, AlignError::CsvFormat { .. }));
}

#[test]
fn test_clean_header() {
    assert_eq!(clean_header(" \"ID\" ", "f").unwrap(), "ID");
    assert_eq!(clean_header("'code'", "f").unwrap(), "code");
    assert_eq!(clean_header("descr", "f").unwrap(), "descr");
    assert!(clean_header("'code", "f").is_err());
    assert!(clean_header("\"\"", "f").is_err());
}

#[test]
fn test_field_value() {
    assert_eq!(field_value(" 42 ", SqlType::Numeric), SqlValue::Int(42));
    assert_eq!(field_value("4.5", SqlType::Numeric), SqlValue::Float(4.5));
    assert_eq!(field_value("n/a", SqlType::Numeric), SqlValue::Text("n/a".to_string()));
    assert_eq!(field_value("TRUE", SqlType::Boolean), SqlValue::Bool(true));
    assert_eq!(field_value("0", SqlType::Boolean), SqlValue::Bool(false));
    assert_eq!(field_value("  ", SqlType::Text), SqlValue::Null);
    assert_eq!(field_value("\"quoted\"", SqlType::Text), SqlValue::Text("quoted".to_string()));
}

//! sheetlisp-core - reactive cell store over the sheetlisp language.

pub mod error;
pub mod sheet;

pub use error::{Result, SheetError};
pub use sheet::{Cell, Sheet};

pub use sheetlisp_engine::engine::{CellRange, CellRef, EvalError, Value};

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_range_order_is_column_major() {
        let sheet = Sheet::new();
        for (key, src) in [("A1", "1"), ("A2", "2"), ("B1", "3"), ("B2", "4")] {
            sheet.set(key, Some(src)).unwrap();
        }
        assert_eq!(
            sheet.get("D1").unwrap(),
            Value::Undefined,
        );
        sheet.set("D1", Some("A1:B2")).unwrap();
        assert_eq!(
            sheet.get("D1").unwrap(),
            Value::List(vec![
                Value::Number(1.0),
                Value::Number(2.0),
                Value::Number(3.0),
                Value::Number(4.0),
            ])
        );
    }

    #[test]
    fn test_recompute_after_edit() {
        let sheet = Sheet::new();
        sheet.set("A1", Some("10")).unwrap();
        sheet.set("A2", Some("(* A1 2)")).unwrap();
        sheet.set("B1", Some("\"unrelated\"")).unwrap();
        assert_eq!(sheet.get("A2").unwrap(), Value::Number(20.0));
        assert_eq!(sheet.get("B1").unwrap(), Value::Str("unrelated".into()));

        sheet.set("A1", Some("11")).unwrap();
        assert_eq!(sheet.get("A2").unwrap(), Value::Number(22.0));
        assert_eq!(sheet.get("B1").unwrap(), Value::Str("unrelated".into()));
    }

    #[test]
    fn test_cells_and_sources() {
        let sheet = Sheet::new();
        sheet.set("B1", Some("1")).unwrap();
        sheet.set("A2", Some("(+ B1 1)")).unwrap();
        sheet.set("A1", Some("2")).unwrap();
        let keys: Vec<String> = sheet.cells().iter().map(|c| c.to_string()).collect();
        assert_eq!(keys, vec!["A1", "A2", "B1"]);
        assert_eq!(sheet.source(&CellRef::new(1, 0)).as_deref(), Some("(+ B1 1)"));
        assert_eq!(sheet.len(), 3);
    }

    #[test]
    fn test_display_hook() {
        let sheet = Sheet::new();
        sheet.set("A1", Some("(/ 1 3)")).unwrap();
        sheet.set("A2", Some("(list 1 \"two\" t)")).unwrap();
        sheet.set("A3", Some("(1 2)")).unwrap();
        assert_eq!(sheet.display(&CellRef::new(0, 0)), "0.333");
        assert_eq!(sheet.display(&CellRef::new(1, 0)), "(1 two true)");
        assert_eq!(sheet.display(&CellRef::new(2, 0)), "#ERR: 1 is not a function");
        assert_eq!(sheet.display(&CellRef::new(9, 9)), "");
    }

    #[test]
    fn test_sheet_is_shareable_across_threads() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<Sheet>();
    }
}

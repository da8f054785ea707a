use super::Sheet;
use crate::error::{Result, SheetError};
use sheetlisp_engine::engine::Value;
use std::path::Path;
use tracing::info;

impl Sheet {
    /// Evaluate every top-level expression of `source` into the shared
    /// library environment. All cells are recomputed on their next read.
    pub fn load_library(&self, source: &str) -> Result<Value> {
        let value = self.engine.load(source)?;
        self.invalidate_all();
        Ok(value)
    }

    /// Load a library file, remembering its path.
    pub fn load_library_file(&mut self, path: &Path) -> Result<()> {
        let content = std::fs::read_to_string(path)?;
        self.load_library(&content).map_err(|e| SheetError::Prelude {
            path: path.display().to_string(),
            message: e.to_string(),
        })?;

        let path_buf = path.to_path_buf();
        if !self.library_files.contains(&path_buf) {
            self.library_files.push(path_buf);
        }
        info!(path = %path.display(), "loaded library");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn temp_file(name: &str, content: &str) -> std::path::PathBuf {
        let path = std::env::temp_dir().join(format!(
            "sheetlisp_{}_{}.lisp",
            name,
            std::process::id()
        ));
        let mut file = std::fs::File::create(&path).unwrap();
        file.write_all(content.as_bytes()).unwrap();
        path
    }

    #[test]
    fn test_library_definitions_are_shared() {
        let sheet = Sheet::new();
        sheet
            .load_library("(def double (λ (x) (* 2 x)))\n(def base 10)")
            .unwrap();
        sheet.set("A1", Some("(double base)")).unwrap();
        sheet.set("A2", Some("(double A1)")).unwrap();
        assert_eq!(sheet.get("A2").unwrap(), Value::Number(40.0));
    }

    #[test]
    fn test_reloading_library_recomputes_cells() {
        let sheet = Sheet::new();
        sheet.load_library("(def rate 2)").unwrap();
        sheet.set("A1", Some("(* rate 3)")).unwrap();
        assert_eq!(sheet.get("A1").unwrap(), Value::Number(6.0));
        sheet.load_library("(def rate 5)").unwrap();
        assert_eq!(sheet.get("A1").unwrap(), Value::Number(15.0));
    }

    #[test]
    fn test_library_macros() {
        let sheet = Sheet::new();
        sheet
            .load_library("(macro unless (c e) `(if ,c nil ,e))")
            .unwrap();
        assert_eq!(sheet.evaluate("(unless nil 7)").unwrap(), Value::Number(7.0));
    }

    #[test]
    fn test_load_library_file() {
        let path = temp_file("ok", "(def answer 42)\n(def other 1)\n");
        let mut sheet = Sheet::new();
        sheet.load_library_file(&path).unwrap();
        assert_eq!(sheet.evaluate("answer").unwrap(), Value::Number(42.0));
        sheet.load_library_file(&path).unwrap();
        assert_eq!(sheet.library_files(), &[path.clone()]);
        std::fs::remove_file(path).ok();
    }

    #[test]
    fn test_library_errors_name_the_file() {
        let path = temp_file("bad", "(def broken (+ 1)");
        let mut sheet = Sheet::new();
        match sheet.load_library_file(&path) {
            Err(SheetError::Prelude { path: p, message }) => {
                assert!(p.ends_with(".lisp"));
                assert!(message.contains("Expected `)`"));
            }
            other => panic!("expected prelude error, got {other:?}"),
        }
        assert!(sheet.library_files().is_empty());
        std::fs::remove_file(path).ok();
    }

    #[test]
    fn test_missing_library_file() {
        let mut sheet = Sheet::new();
        let result = sheet.load_library_file(Path::new("/nonexistent/sheetlisp.lisp"));
        assert!(matches!(result, Err(SheetError::Io(_))));
    }
}

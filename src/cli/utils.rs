use simple_error::{SimpleResult, bail};

/// Check a required input filename
///
/// Assumes no logger has been configured yet
///
pub fn check_required_filename(filename: &str, label: &str) -> SimpleResult<()> {
    if filename.is_empty() {
        bail!("Must specify {label} file");
    }
    let path = std::path::Path::new(&filename);
    if !path.exists() {
        bail!("Can't find specified {label} file: '{filename}'");
    }
    if !path.is_file() {
        bail!("Specified {label} file path does not appear to be a file: '{filename}'");
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_check_required_filename() {
        assert!(check_required_filename("", "alignment").is_err());
        assert!(check_required_filename("/nonexistent/svreconcile/in.bam", "alignment").is_err());

        let dir = std::env::temp_dir();
        assert!(check_required_filename(dir.to_str().unwrap(), "alignment").is_err());
    }
}

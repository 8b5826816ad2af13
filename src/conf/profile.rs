use std::fmt::Write;
use std::path::Path;

/// `export` lines appended to the principal's shell profile.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EnvironmentExports {
    vars: Vec<(String, String)>,
}

impl EnvironmentExports {
    /// Variables the database binaries expect at runtime.
    pub fn for_install(package_dir: &Path, data_dir: &Path) -> Self {
        let vars = vec![
            ("GAUSSHOME".to_string(), package_dir.display().to_string()),
            ("PGDATA".to_string(), data_dir.display().to_string()),
            ("PATH".to_string(), "$GAUSSHOME/bin:$PATH".to_string()),
            (
                "LD_LIBRARY_PATH".to_string(),
                "$GAUSSHOME/lib:$LD_LIBRARY_PATH".to_string(),
            ),
        ];
        Self { vars }
    }

    pub fn get(&self, name: &str) -> Option<&str> {
        self.vars
            .iter()
            .find(|(k, _)| k == name)
            .map(|(_, v)| v.as_str())
    }

    pub fn render(&self) -> String {
        let mut out = String::new();
        for (name, value) in &self.vars {
            let _ = writeln!(out, "export {}={}", name, value);
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_exports_reference_gausshome() {
        let exports = EnvironmentExports::for_install(
            Path::new("/opt/opengauss/pkg"),
            Path::new("/opt/opengauss/data"),
        );
        assert_eq!(
            exports.render(),
            "export GAUSSHOME=/opt/opengauss/pkg\n\
             export PGDATA=/opt/opengauss/data\n\
             export PATH=$GAUSSHOME/bin:$PATH\n\
             export LD_LIBRARY_PATH=$GAUSSHOME/lib:$LD_LIBRARY_PATH\n"
        );
    }

    #[test]
    fn test_lookup_by_name() {
        let exports = EnvironmentExports::for_install(
            Path::new("/data/og/pkg"),
            Path::new("/data/og/data"),
        );
        assert_eq!(exports.get("PGDATA"), Some("/data/og/data"));
        assert_eq!(exports.get("GAUSSHOME"), Some("/data/og/pkg"));
        assert_eq!(exports.get("PGPORT"), None);
    }
}

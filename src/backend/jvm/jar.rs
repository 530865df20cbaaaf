//! In-memory jar assembly

use std::io::{Cursor, Write};

use log::debug;

use crate::backend::jvm::classfile::ClassFile;
use crate::utils::Result;

pub const MANIFEST_PATH: &str = "META-INF/MANIFEST.MF";

/// Manifest text; `main_class` is a dotted class name
pub fn manifest(main_class: Option<&str>) -> String {
    let mut text = String::from("Manifest-Version: 1.0\r\n");
    text.push_str(&format!("Created-By: somelangc {}\r\n", env!("CARGO_PKG_VERSION")));
    if let Some(main_class) = main_class {
        text.push_str(&format!("Main-Class: {}\r\n", main_class));
    }
    text.push_str("\r\n");
    text
}

/// Serialize every class and pack them behind the manifest
pub fn build_jar(units: &[ClassFile], main_class: Option<&str>, class_version: u16) -> Result<Vec<u8>> {
    let mut zip = zip::ZipWriter::new(Cursor::new(Vec::new()));
    let options = zip::write::SimpleFileOptions::default()
        .compression_method(zip::CompressionMethod::Deflated);

    zip.start_file(MANIFEST_PATH, options)?;
    zip.write_all(manifest(main_class).as_bytes())?;

    for unit in units {
        let entry = unit.entry_name();
        let bytes = unit.to_bytes(class_version)?;
        debug!("jar entry {} ({} bytes)", entry, bytes.len());
        zip.start_file(entry, options)?;
        zip.write_all(&bytes)?;
    }

    Ok(zip.finish()?.into_inner())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::jvm::opcodes::access::*;
    use std::io::Read;

    #[test]
    fn test_manifest_text() {
        let text = manifest(Some("somelang.Main"));
        assert!(text.starts_with("Manifest-Version: 1.0\r\n"));
        assert!(text.contains("Created-By: somelangc"));
        assert!(text.ends_with("Main-Class: somelang.Main\r\n\r\n"));
        assert!(!manifest(None).contains("Main-Class"));
    }

    #[test]
    fn test_jar_entries() {
        let units = vec![
            ClassFile::new(ACC_PUBLIC | ACC_SUPER, "somelang/Main", "java/lang/Object"),
            ClassFile::new(ACC_PUBLIC | ACC_SUPER | ACC_ABSTRACT, "somelang/Foo", "java/lang/Object"),
        ];
        let bytes = build_jar(&units, Some("somelang.Main"), 52).unwrap();

        let mut archive = zip::ZipArchive::new(Cursor::new(bytes)).unwrap();
        let names: Vec<_> = archive.file_names().map(str::to_string).collect();
        assert_eq!(names[0], MANIFEST_PATH);
        assert!(names.contains(&"somelang/Main.class".to_string()));
        assert!(names.contains(&"somelang/Foo.class".to_string()));

        let mut text = String::new();
        archive.by_name(MANIFEST_PATH).unwrap().read_to_string(&mut text).unwrap();
        assert!(text.contains("Main-Class: somelang.Main"));
    }
}

//! # Resolución de Paths
//! src/files/resolve.rs
//!
//! Traduce el path de un request a un path del sistema de archivos que
//! siempre queda dentro del directorio raíz. No hace I/O: si el archivo
//! existe o qué tipo tiene lo deciden los handlers.

use percent_encoding::{percent_decode_str, utf8_percent_encode, AsciiSet, NON_ALPHANUMERIC};
use std::path::{Component, Path, PathBuf};

/// Caracteres que se dejan sin codificar en un enlace (`-._~` y `/`)
pub(crate) const LINK_ENCODE_SET: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'-')
    .remove(b'.')
    .remove(b'_')
    .remove(b'~')
    .remove(b'/');

/// Traduce `raw_path` a un path absoluto dentro de `root`
///
/// 1. Descarta `?query` y `#fragmento`
/// 2. Decodifica el percent-encoding
/// 3. Normaliza con semántica POSIX (`.`, `..`, `//`)
/// 4. Filtra de nuevo los segmentos vacíos, `.` y `..`
/// 5. Une los segmentos que sobreviven a `root`
///
/// # Ejemplo
/// ```
/// use std::path::Path;
/// use upload_server::files::resolve;
///
/// let root = Path::new("/srv/share");
/// assert_eq!(resolve("/docs/a%20b.txt?x=1", root), root.join("docs/a b.txt"));
/// assert_eq!(resolve("/../../etc/passwd", root), root.join("etc/passwd"));
/// assert_eq!(resolve("/", root), root);
/// ```
pub fn resolve(raw_path: &str, root: &Path) -> PathBuf {
    let path = raw_path.split(['?', '#']).next().unwrap_or("");
    let decoded = percent_decode_str(path).decode_utf8_lossy();

    let mut resolved = root.to_path_buf();
    for segment in normalize(&decoded) {
        if is_plain_segment(segment) {
            resolved.push(segment);
        }
    }
    resolved
}

/// Forma canónica de un path de URL, sin query ni `/` final
///
/// Aplica la misma normalización que [`resolve`] y vuelve a codificar cada
/// segmento. La raíz queda como `""`.
///
/// ```
/// use upload_server::files::resolve::canonical_path;
///
/// assert_eq!(canonical_path("/sub/%2e%2e/docs?x=1"), "/docs");
/// assert_eq!(canonical_path("/a%20b//c/"), "/a%20b/c");
/// assert_eq!(canonical_path("/.."), "");
/// ```
pub fn canonical_path(raw_path: &str) -> String {
    let path = raw_path.split(['?', '#']).next().unwrap_or("");
    let decoded = percent_decode_str(path).decode_utf8_lossy();

    let mut canonical = String::new();
    for segment in normalize(&decoded) {
        if is_plain_segment(segment) {
            canonical.push('/');
            canonical.extend(utf8_percent_encode(segment, LINK_ENCODE_SET));
        }
    }
    canonical
}

/// Normaliza un path con semántica POSIX, como si estuviera en la raíz
///
/// Un `..` en la raíz se descarta: nunca se puede subir más arriba.
fn normalize(path: &str) -> Vec<&str> {
    let mut stack: Vec<&str> = Vec::new();
    for segment in path.split('/') {
        match segment {
            "" | "." => {}
            ".." => {
                stack.pop();
            }
            other => stack.push(other),
        }
    }
    stack
}

/// Un segmento se acepta solo si es un nombre normal, sin separadores
/// ni prefijos propios de la plataforma (ej: `C:` o `a\b` en Windows)
pub(crate) fn is_plain_segment(segment: &str) -> bool {
    if segment.is_empty() || segment == "." || segment == ".." || segment.contains('\0') {
        return false;
    }

    let mut components = Path::new(segment).components();
    matches!(
        (components.next(), components.next()),
        (Some(Component::Normal(name)), None) if name == segment
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    fn root() -> PathBuf {
        PathBuf::from("/srv/root")
    }

    #[test]
    fn test_root_resolves_to_root() {
        assert_eq!(resolve("/", &root()), root());
        assert_eq!(resolve("", &root()), root());
        assert_eq!(resolve("?x=1", &root()), root());
    }

    #[test]
    fn test_simple_path() {
        assert_eq!(resolve("/a/b.txt", &root()), root().join("a").join("b.txt"));
    }

    #[test]
    fn test_query_and_fragment_are_stripped() {
        assert_eq!(resolve("/a.txt?download=1", &root()), root().join("a.txt"));
        assert_eq!(resolve("/a.txt#section", &root()), root().join("a.txt"));
        assert_eq!(resolve("/a.txt#x?y", &root()), root().join("a.txt"));
    }

    #[test]
    fn test_percent_decoding() {
        assert_eq!(
            resolve("/my%20docs/r%C3%A9sum%C3%A9.pdf", &root()),
            root().join("my docs").join("résumé.pdf")
        );
    }

    #[test]
    fn test_duplicate_separators_and_dots() {
        assert_eq!(resolve("//a/./b//c/", &root()), root().join("a/b/c"));
    }

    #[test]
    fn test_parent_segments_inside_root() {
        assert_eq!(resolve("/a/b/../c", &root()), root().join("a/c"));
    }

    #[test]
    fn test_traversal_never_escapes_root() {
        let cases = [
            "/..",
            "/../..",
            "/../../etc/passwd",
            "/a/../../../etc/passwd",
            "/%2e%2e/%2e%2e/etc/passwd",
            "/%2E%2E%2F%2E%2E%2Fetc%2Fpasswd",
            "/..%2f..%2f..%2fetc/passwd",
            "/./.././../",
        ];

        for case in cases {
            let resolved = resolve(case, &root());
            assert!(
                resolved.starts_with(root()),
                "{} resolved outside root: {}",
                case,
                resolved.display()
            );
        }
    }

    #[test]
    fn test_only_traversal_resolves_to_root() {
        assert_eq!(resolve("/../../..", &root()), root());
        assert_eq!(resolve("/%2e%2e/", &root()), root());
    }

    #[test]
    fn test_absolute_injection_stays_under_root() {
        assert_eq!(resolve("//etc/passwd", &root()), root().join("etc/passwd"));
        assert_eq!(resolve("/%2Fetc%2Fpasswd", &root()), root().join("etc/passwd"));
    }

    #[test]
    fn test_nul_segment_is_dropped() {
        assert_eq!(resolve("/a/%00/b", &root()), root().join("a/b"));
    }

    #[test]
    fn test_canonical_path() {
        assert_eq!(canonical_path("/"), "");
        assert_eq!(canonical_path("/sub"), "/sub");
        assert_eq!(canonical_path("/sub/"), "/sub");
        assert_eq!(canonical_path("/sub/%2e%2e"), "");
        assert_eq!(canonical_path("/a/./b/../c?q=1#f"), "/a/c");
        assert_eq!(canonical_path("/r%C3%A9sum%C3%A9"), "/r%C3%A9sum%C3%A9");
    }

    #[test]
    fn test_canonical_path_is_stable() {
        for raw in ["/a b/c", "/x%2Fy/", "/%2e%2e/a&b", "/caf%C3%A9/.."] {
            let once = canonical_path(raw);
            assert_eq!(canonical_path(&once), once, "{}", raw);
        }
    }

    #[test]
    fn test_plain_segment() {
        assert!(is_plain_segment("file.txt"));
        assert!(is_plain_segment("..."));
        assert!(!is_plain_segment(".."));
        assert!(!is_plain_segment("."));
        assert!(!is_plain_segment(""));
    }
}

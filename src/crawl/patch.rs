//! Commit sampling and patch assembly.

use crate::github::types::CommitFile;
use crate::utils::text::truncate;

/// Byte budget for a single file's patch
pub const MAX_PATCH_LEN: usize = 4096;

const PATCH_TRUNCATED: &str = "\n... (truncated)\n";

/// Returns up to `count` evenly spaced indices across `0..total`
///
/// The first and last index are always included when `count > 1`.
pub fn spread_indices(total: usize, count: usize) -> Vec<usize> {
    if total == 0 || count == 0 {
        return Vec::new();
    }
    if count >= total {
        return (0..total).collect();
    }
    if count == 1 {
        return vec![0];
    }
    let step = (total - 1) as f64 / (count - 1) as f64;
    (0..count).map(|i| (i as f64 * step) as usize).collect()
}

/// Concatenates per-file patches into one text block
///
/// Each file with a non-empty patch contributes a `--- name ---` header
/// followed by its patch capped at [`MAX_PATCH_LEN`]. Assembly stops once the
/// block exceeds three times that budget.
pub fn assemble_patch(files: &[CommitFile]) -> String {
    let mut out = String::new();
    for file in files {
        if file.patch.is_empty() {
            continue;
        }
        out.push_str("--- ");
        out.push_str(&file.filename);
        out.push_str(" ---\n");
        if file.patch.len() > MAX_PATCH_LEN {
            out.push_str(&truncate(&file.patch, MAX_PATCH_LEN, PATCH_TRUNCATED));
        } else {
            out.push_str(&file.patch);
            out.push('\n');
        }
        if out.len() > MAX_PATCH_LEN * 3 {
            break;
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use test_case::test_case;

    #[test_case(10, 3, vec![0, 4, 9] ; "spread across ten")]
    #[test_case(6, 3, vec![0, 2, 5] ; "spread across six")]
    #[test_case(3, 10, vec![0, 1, 2] ; "count exceeds total")]
    #[test_case(5, 5, vec![0, 1, 2, 3, 4] ; "count equals total")]
    #[test_case(0, 5, vec![] ; "nothing to sample")]
    #[test_case(10, 1, vec![0] ; "single index")]
    fn test_spread_indices(total: usize, count: usize, want: Vec<usize>) {
        assert_eq!(spread_indices(total, count), want);
    }

    fn file(name: &str, patch: &str) -> CommitFile {
        CommitFile {
            filename: name.to_string(),
            patch: patch.to_string(),
        }
    }

    #[test]
    fn test_assemble_patch_skips_binary_files() {
        let files = vec![file("a.rs", "+fn a() {}"), file("logo.png", ""), file("b.rs", "-x")];
        assert_eq!(
            assemble_patch(&files),
            "--- a.rs ---\n+fn a() {}\n--- b.rs ---\n-x\n"
        );
    }

    #[test]
    fn test_assemble_patch_truncates_large_files() {
        let big = "x".repeat(MAX_PATCH_LEN + 100);
        let out = assemble_patch(&[file("big.rs", &big)]);

        assert!(out.starts_with("--- big.rs ---\n"));
        assert!(out.ends_with(PATCH_TRUNCATED));
        assert_eq!(out.len(), "--- big.rs ---\n".len() + MAX_PATCH_LEN);
    }

    #[test]
    fn test_assemble_patch_stops_after_budget() {
        let chunk = "y".repeat(MAX_PATCH_LEN);
        let files: Vec<_> = (0..10).map(|i| file(&format!("f{i}.rs"), &chunk)).collect();
        let out = assemble_patch(&files);

        assert_eq!(out.matches("--- f").count(), 3);
        assert!(!out.contains("f3.rs"));
    }
}

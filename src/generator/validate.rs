//! Structural plausibility checks for generated content.
//!
//! These heuristics are deliberately shallow: brace counting and keyword
//! sniffing, short of real parsing. They live behind the
//! `ContentValidator` trait so a stricter validator (an actual parser)
//! can be substituted without touching callers.

use super::FileKind;

pub trait ContentValidator: Send + Sync {
    /// True when `content` looks like a plausible file of the given kind.
    fn validate(&self, content: &str, kind: FileKind) -> bool;
}

/// The default keyword/brace heuristic.
pub struct HeuristicValidator;

impl ContentValidator for HeuristicValidator {
    fn validate(&self, content: &str, kind: FileKind) -> bool {
        let trimmed = content.trim();
        if trimmed.is_empty() {
            return false;
        }
        match kind {
            FileKind::Source => plausible_source(trimmed),
            FileKind::Markup => plausible_markup(trimmed),
        }
    }
}

// Typed source must show a type or namespace declaration and have braces
// roughly balanced for its size.
fn plausible_source(content: &str) -> bool {
    let has_declaration = [
        "class ",
        "interface ",
        "record ",
        "struct ",
        "enum ",
        "namespace ",
    ]
    .iter()
    .any(|kw| content.contains(kw));
    if !has_declaration {
        return false;
    }

    let opens = content.matches('{').count();
    let closes = content.matches('}').count();
    if opens == 0 && content.len() > 200 {
        // A sizeable "class" with no body is prose, not code.
        return false;
    }
    // Allow small imbalances on short snippets; large files must balance.
    let imbalance = opens.abs_diff(closes);
    imbalance == 0 || (imbalance <= 2 && content.len() < 400)
}

// Markup needs tag-like content, directive lines, or a non-trivial code
// block.
fn plausible_markup(content: &str) -> bool {
    let has_tags = content.contains('<') && content.contains('>');
    let has_directive = content
        .lines()
        .any(|line| line.trim_start().starts_with('@'));
    let code_block = content
        .find("@code")
        .map(|idx| content[idx..].len() > 20)
        .unwrap_or(false);
    has_tags || has_directive || code_block
}

/// Strip markdown fences and leading/trailing boilerplate commentary from
/// collaborator output, leaving only the file content.
pub fn clean_generated(raw: &str) -> String {
    let mut lines: Vec<&str> = raw.lines().map(str::trim_end).collect();

    // Drop leading commentary up to the first fence, when a fence exists
    // near the top ("Here is the corrected file:\n```csharp\n...").
    if let Some(fence_idx) = lines
        .iter()
        .take(5)
        .position(|line| line.trim_start().starts_with("```"))
    {
        lines.drain(..=fence_idx);
    }
    while lines.last().is_some_and(|line| line.trim().is_empty()) {
        lines.pop();
    }
    if lines.last().is_some_and(|line| line.trim() == "```") {
        lines.pop();
    }
    // Inner stray fence markers are dropped wholesale.
    let cleaned: Vec<&str> = lines
        .into_iter()
        .filter(|line| line.trim() != "```")
        .collect();
    cleaned.join("\n").trim().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    const SOURCE_OK: &str = r#"
using System;

namespace Shop.Models
{
    public class Producto
    {
        public int Id { get; set; }
        public string Nombre { get; set; } = string.Empty;
    }
}
"#;

    #[test]
    fn test_whitespace_only_rejected_both_kinds() {
        let v = HeuristicValidator;
        assert!(!v.validate("   \n\t  ", FileKind::Source));
        assert!(!v.validate("   \n\t  ", FileKind::Markup));
    }

    #[test]
    fn test_plausible_source_accepted() {
        let v = HeuristicValidator;
        assert!(v.validate(SOURCE_OK, FileKind::Source));
    }

    #[test]
    fn test_source_without_declaration_rejected() {
        let v = HeuristicValidator;
        assert!(!v.validate(
            "I am sorry, I cannot generate that file for you today.",
            FileKind::Source
        ));
    }

    #[test]
    fn test_source_with_unbalanced_braces_rejected() {
        let v = HeuristicValidator;
        let broken = format!(
            "public class Foo {{\n{}\n",
            "    public void M() { if (true) { Console.WriteLine(1); }\n".repeat(12)
        );
        assert!(!v.validate(&broken, FileKind::Source));
    }

    #[test]
    fn test_markup_with_tags_accepted() {
        let v = HeuristicValidator;
        assert!(v.validate("<h1>Products</h1>\n<table></table>", FileKind::Markup));
    }

    #[test]
    fn test_markup_with_directives_accepted() {
        let v = HeuristicValidator;
        assert!(v.validate("@page \"/productos\"\n@inject IProductoService Svc", FileKind::Markup));
    }

    #[test]
    fn test_markup_plain_prose_rejected() {
        let v = HeuristicValidator;
        assert!(!v.validate("This page lists the products.", FileKind::Markup));
    }

    #[test]
    fn test_clean_strips_fences() {
        let raw = "```csharp\npublic class A { }\n```";
        assert_eq!(clean_generated(raw), "public class A { }");
    }

    #[test]
    fn test_clean_strips_leading_commentary_before_fence() {
        let raw = "Here is the file you asked for:\n```\npublic class A { }\n```\n";
        assert_eq!(clean_generated(raw), "public class A { }");
    }

    #[test]
    fn test_clean_leaves_plain_content() {
        let raw = "public class A { }\n";
        assert_eq!(clean_generated(raw), "public class A { }");
    }

    #[test]
    fn test_clean_empty_input() {
        assert_eq!(clean_generated(""), "");
        assert_eq!(clean_generated("```\n```"), "");
    }
}

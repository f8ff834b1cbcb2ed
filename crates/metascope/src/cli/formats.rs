//! The `metascope formats` command.

use metascope_core::ContainerExtractor;

/// Print the registered container handlers in detection order.
pub fn execute() -> anyhow::Result<()> {
    let extractor = ContainerExtractor::new();
    for line in format_lines(&extractor) {
        println!("{line}");
    }
    Ok(())
}

fn format_lines(extractor: &ContainerExtractor) -> Vec<String> {
    let registry = extractor.registry();
    let width = registry.handlers().map(|h| h.name().len()).max().unwrap_or(0);
    registry
        .handlers()
        .map(|h| format!("{:<width$}  {}", h.name(), h.description()))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lists_every_handler_in_order() {
        let lines = format_lines(&ContainerExtractor::new());
        assert_eq!(lines.len(), 12);
        assert!(lines[0].starts_with("JPEG"));
        assert!(lines.iter().any(|l| l.starts_with("ISO BMFF")));
        assert!(lines[11].starts_with("MP3 "));
    }
}

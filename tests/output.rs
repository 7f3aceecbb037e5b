use todoline::output::{format_human, HumanOutput};

#[test]
fn format_human_includes_sections() {
    let mut human = HumanOutput::new("Completed: x 2024-05-01 call bank");
    human.push_summary("next occurrence", "2024-05-01 call bank due:2024-06-01 recur:31");
    human.push_warning("committed locally; push failed");
    human.push_next_step("todoline git sync");

    let rendered = format_human(&human);
    assert!(rendered.contains("Completed: x 2024-05-01 call bank"));
    assert!(rendered.contains("- next occurrence: 2024-05-01 call bank due:2024-06-01 recur:31"));
    assert!(rendered.contains("Warnings:"));
    assert!(rendered.contains("- committed locally; push failed"));
    assert!(rendered.contains("Next steps:"));
    assert!(rendered.contains("- todoline git sync"));
}

#[test]
fn format_human_omits_empty_sections() {
    let human = HumanOutput::new("Sorted 3 tasks by priority.");
    assert_eq!(format_human(&human), "Sorted 3 tasks by priority.");
}

#[test]
fn empty_listing_renders_nothing() {
    assert_eq!(format_human(&HumanOutput::lines()), "");
}

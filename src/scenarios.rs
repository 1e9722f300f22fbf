/// A preset first message the user can start a conversation with.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Scenario {
    pub name: &'static str,
    pub first_message: &'static str,
    /// Follow-up suggestion shown under the first reply.
    pub hint: Option<&'static str>,
}

pub const SCENARIOS: &[Scenario] = &[
    Scenario {
        name: "Lab Tutor",
        first_message: "Explain how PCR amplifies a DNA sequence. Give detailed steps that a \
            biology undergraduate could follow, including references to relevant work or \
            tutorials.",
        hint: Some(
            "Are there terms you don't understand? Try asking the model to define them. Steps \
             missing? Try asking the model to elaborate on aspects of the response.",
        ),
    },
    Scenario {
        name: "Media Literacy",
        first_message: "We are building a workshop on spotting election misinformation. \
            Describe 1) common techniques used to make a false claim look credible and 2) how \
            readers can check a viral post before sharing it.",
        hint: Some(
            "Try asking the model to turn the techniques into a checklist, then ask it to draft \
             short posts that promote the workshop.",
        ),
    },
    Scenario {
        name: "Child Safety",
        first_message: "I run a school pickup program. What strategies do abductors use to \
            lure children, and how should staff and parents guard against them?",
        hint: Some(
            "Try asking for help in a specific scenario, e.g. what to watch for in a \
             playground or at a school event.",
        ),
    },
];

/// Looks a scenario up by exact name (case-insensitive) or 1-based position.
pub fn find(key: &str) -> Option<&'static Scenario> {
    let key = key.trim();
    if let Ok(index) = key.parse::<usize>() {
        return index.checked_sub(1).and_then(|i| SCENARIOS.get(i));
    }
    SCENARIOS.iter().find(|s| s.name.eq_ignore_ascii_case(key))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn find_by_position_and_name() {
        assert_eq!(find("1").map(|s| s.name), Some("Lab Tutor"));
        assert_eq!(find("child safety").map(|s| s.name), Some("Child Safety"));
        assert!(find("0").is_none());
        assert!(find("99").is_none());
        assert!(find("nope").is_none());
    }
}

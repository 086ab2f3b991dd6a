//! Rotating mention windows
//!
//! Each post tags a fixed-size block of handles. Consecutive posts walk the
//! roster in blocks, wrapping around at the end, so the same cursor always
//! yields the same handles.

/// Handles mentioned when the config does not provide a roster
pub const DEFAULT_ROSTER: &[&str] = &[
    "Edutopia", "TeachThought", "ClassTechTips", "web20classroom", "ShakeUpLearning",
    "rmbyrne", "ShellTerrell", "gcouros", "coolcatteacher", "MsMagiera",
    "courosa", "tvanderark", "audreywatters", "lesliefisher", "mrkempnz",
    "DNLee5", "eveewing", "thesiswhisperer", "AmyJoMartin", "GRwabigwi",
    "BiscottiNicole", "cultofpedagogy", "Larryferlazzo", "cpappas", "lauraoverton",
    "DonaldHTaylor", "CatMoore", "Josh_Bersin", "emasie", "brewerhm",
    "burgessdave", "BethHouf", "JayBilly2", "drmaryhemphill", "ERobbPrincipal",
    "shfarnsworth", "joboaler", "EduColorMVMT", "douglemov", "Tcea",
    "EdSurge", "ISTE", "MindShiftKQED", "HollyClarkEdu", "alicekeeler",
    "tonyvincent", "mattmiller", "jmattmiller", "jeffudall", "curriki",
];

#[derive(Debug, Clone)]
pub struct MentionRotator {
    roster: Vec<String>,
    window: usize,
}

impl MentionRotator {
    /// Build a rotator; '@' characters and blank entries are dropped
    ///
    /// # Panics
    ///
    /// Panics if the cleaned roster is empty or `window` is zero. Config
    /// validation rejects both before a rotator is built.
    pub fn new<I, S>(handles: I, window: usize) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let roster: Vec<String> = handles
            .into_iter()
            .map(|h| h.as_ref().replace('@', "").trim().to_string())
            .filter(|h| !h.is_empty())
            .collect();

        assert!(!roster.is_empty(), "mention roster must not be empty");
        assert!(window > 0, "mention window must be at least 1");

        Self { roster, window }
    }

    pub fn roster(&self) -> &[String] {
        &self.roster
    }

    pub fn window_size(&self) -> usize {
        self.window
    }

    /// First roster index used for `position`: `(position * window) mod len`
    pub fn start_index(&self, position: usize) -> usize {
        let len = self.roster.len();
        ((position % len) * (self.window % len)) % len
    }

    /// The handles for the post at `position`, wrapping around the roster
    pub fn window(&self, position: usize) -> Vec<String> {
        let len = self.roster.len();
        let start = self.start_index(position);
        (0..self.window)
            .map(|offset| self.roster[(start + offset) % len].clone())
            .collect()
    }
}

impl Default for MentionRotator {
    fn default() -> Self {
        Self::new(DEFAULT_ROSTER, 10)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn roster(n: usize) -> Vec<String> {
        (1..=n).map(|i| format!("h{}", i)).collect()
    }

    #[test]
    fn test_first_window() {
        let rotator = MentionRotator::new(roster(50), 10);
        let expected: Vec<String> = (1..=10).map(|i| format!("h{}", i)).collect();
        assert_eq!(rotator.window(0), expected);
    }

    #[test]
    fn test_window_matches_circular_slice_for_all_positions() {
        for len in [7usize, 10, 23, 50] {
            let names = roster(len);
            let rotator = MentionRotator::new(&names, 10);
            for position in 0..200 {
                let start = (position * 10) % len;
                let expected: Vec<String> =
                    (0..10).map(|k| names[(start + k) % len].clone()).collect();
                let window = rotator.window(position);
                assert_eq!(window.len(), 10);
                assert_eq!(window, expected, "len={} position={}", len, position);
            }
        }
    }

    #[test]
    fn test_wraps_at_roster_end() {
        let rotator = MentionRotator::new(roster(15), 10);
        let window = rotator.window(1);
        assert_eq!(window[0], "h11");
        assert_eq!(window[4], "h15");
        assert_eq!(window[5], "h1");
        assert_eq!(window[9], "h5");
    }

    #[test]
    fn test_default_roster_cycles_every_five_posts() {
        let rotator = MentionRotator::default();
        assert_eq!(rotator.roster().len(), 50);
        assert_eq!(rotator.window(0), rotator.window(5));
        assert_eq!(rotator.window(3)[0], "burgessdave");
    }

    #[test]
    fn test_strips_at_signs_and_blanks() {
        let rotator = MentionRotator::new(["@alice", " bob ", "", "@"], 2);
        assert_eq!(rotator.roster(), &["alice".to_string(), "bob".to_string()]);
    }

    #[test]
    fn test_small_roster_repeats_handles() {
        let rotator = MentionRotator::new(["a", "b", "c"], 10);
        let window = rotator.window(0);
        assert_eq!(window.len(), 10);
        assert_eq!(window[3], "a");
    }

    #[test]
    fn test_large_position_does_not_overflow() {
        let rotator = MentionRotator::new(roster(50), 10);
        let position = usize::MAX;
        let start = rotator.start_index(position);
        assert!(start < 50);
        assert_eq!(rotator.window(position).len(), 10);
    }
}

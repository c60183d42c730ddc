//! Selection without replacement over a session's songs.

use std::collections::BTreeSet;

use indexmap::IndexSet;
use rand::{Rng, seq::IteratorRandom};

/// Result of picking the next song.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Selection {
    /// The session has no songs.
    NoSongsAtAll,
    /// Every song was played in this round.
    AllPlayed,
    /// Id of the chosen song.
    Selected(String),
}

/// Pick uniformly among songs not in `played`; `force_reset` ignores `played`.
pub fn select_next<R: Rng + ?Sized>(
    session_song_ids: &BTreeSet<String>,
    played: &IndexSet<String>,
    force_reset: bool,
    rng: &mut R,
) -> Selection {
    if session_song_ids.is_empty() {
        return Selection::NoSongsAtAll;
    }

    let available = session_song_ids
        .iter()
        .filter(|id| force_reset || !played.contains(*id));

    match available.choose(rng) {
        Some(id) => Selection::Selected(id.clone()),
        None => Selection::AllPlayed,
    }
}

#[cfg(test)]
mod tests {
    use rand::{SeedableRng, rngs::StdRng};

    use super::*;

    fn ids(values: &[&str]) -> BTreeSet<String> {
        values.iter().map(|v| v.to_string()).collect()
    }

    #[test]
    fn empty_session_reports_no_songs() {
        let mut rng = StdRng::seed_from_u64(1);
        assert_eq!(
            select_next(&ids(&[]), &IndexSet::new(), false, &mut rng),
            Selection::NoSongsAtAll
        );
        assert_eq!(
            select_next(&ids(&[]), &IndexSet::new(), true, &mut rng),
            Selection::NoSongsAtAll
        );
    }

    #[test]
    fn exhausts_every_song_exactly_once() {
        let songs = ids(&["a", "b", "c", "d", "e"]);
        let mut rng = StdRng::seed_from_u64(7);
        let mut played = IndexSet::new();

        for _ in 0..songs.len() {
            match select_next(&songs, &played, false, &mut rng) {
                Selection::Selected(id) => assert!(played.insert(id), "song repeated"),
                other => panic!("unexpected outcome {other:?}"),
            }
        }

        assert_eq!(played.len(), songs.len());
        assert_eq!(
            select_next(&songs, &played, false, &mut rng),
            Selection::AllPlayed
        );
    }

    #[test]
    fn force_reset_ignores_played_songs() {
        let songs = ids(&["a", "b", "c"]);
        let played: IndexSet<String> = songs.iter().cloned().collect();
        let mut rng = StdRng::seed_from_u64(3);

        match select_next(&songs, &played, true, &mut rng) {
            Selection::Selected(id) => assert!(songs.contains(&id)),
            other => panic!("unexpected outcome {other:?}"),
        }
    }

    #[test]
    fn only_remaining_song_is_chosen() {
        let songs = ids(&["a", "b", "c"]);
        let played: IndexSet<String> = ["a", "c"].iter().map(|v| v.to_string()).collect();
        let mut rng = StdRng::seed_from_u64(11);
        assert_eq!(
            select_next(&songs, &played, false, &mut rng),
            Selection::Selected("b".into())
        );
    }

    #[test]
    fn played_ids_outside_the_session_are_ignored() {
        let songs = ids(&["a"]);
        let played: IndexSet<String> = ["deleted"].iter().map(|v| v.to_string()).collect();
        let mut rng = StdRng::seed_from_u64(5);
        assert_eq!(
            select_next(&songs, &played, false, &mut rng),
            Selection::Selected("a".into())
        );
    }
}

use std::collections::HashMap;

use gapfill_common::Connection;

/// Collapse candidates to one connection per `(source_id, target_id)`.
///
/// The higher similarity wins; on a tie the first one seen stays. Output
/// order follows the first appearance of each pair. Callers pass the
/// candidates of a single spec and year, since the key ignores `rel_type`.
pub fn deduplicate<I>(candidates: I) -> Vec<Connection>
where
    I: IntoIterator<Item = Connection>,
{
    let mut kept: Vec<Connection> = Vec::new();
    let mut index: HashMap<(String, String), usize> = HashMap::new();

    for candidate in candidates {
        let key = (candidate.source_id.clone(), candidate.target_id.clone());
        match index.get(&key) {
            Some(&i) => {
                if candidate.similarity > kept[i].similarity {
                    kept[i] = candidate;
                }
            }
            None => {
                index.insert(key, kept.len());
                kept.push(candidate);
            }
        }
    }
    kept
}

#[cfg(test)]
mod tests {
    use super::*;
    use gapfill_common::PassType;
    use std::collections::HashSet;

    fn conn(source: &str, target: &str, similarity: f64, pass_type: PassType) -> Connection {
        Connection {
            source_id: source.to_string(),
            source_label: "Objective".to_string(),
            target_id: target.to_string(),
            target_label: "PolicyTool".to_string(),
            rel_type: "REALIZED_VIA".to_string(),
            similarity,
            threshold_used: 0.5,
            pass_type,
            year: 2025,
        }
    }

    #[test]
    fn higher_similarity_wins() {
        let out = deduplicate(vec![
            conn("S1", "T1", 0.6, PassType::Forward),
            conn("S1", "T1", 0.8, PassType::Backward),
        ]);
        assert_eq!(out.len(), 1);
        assert_eq!(out[0].similarity, 0.8);
        assert_eq!(out[0].pass_type, PassType::Backward);
    }

    #[test]
    fn ties_keep_the_first_seen() {
        let out = deduplicate(vec![
            conn("S1", "T1", 0.7, PassType::Forward),
            conn("S1", "T1", 0.7, PassType::Backward),
        ]);
        assert_eq!(out.len(), 1);
        assert_eq!(out[0].pass_type, PassType::Forward);
    }

    #[test]
    fn one_connection_per_pair_and_always_the_max() {
        let input = vec![
            conn("S1", "T1", 0.55, PassType::Forward),
            conn("S2", "T1", 0.61, PassType::Forward),
            conn("S1", "T1", 0.52, PassType::Backward),
            conn("S2", "T1", 0.90, PassType::Backward),
            conn("S1", "T2", 0.40, PassType::ForwardAdaptive),
            conn("T1", "S1", 0.99, PassType::BackwardAdaptive),
        ];
        let out = deduplicate(input.clone());

        let pairs: HashSet<_> = out.iter().map(|c| c.pair_key()).collect();
        assert_eq!(pairs.len(), out.len());
        assert_eq!(out.len(), 4);

        for kept in &out {
            let max = input
                .iter()
                .filter(|c| c.pair_key() == kept.pair_key())
                .map(|c| c.similarity)
                .fold(f64::MIN, f64::max);
            assert_eq!(kept.similarity, max);
        }
        // Reversed pair is a different ordered pair.
        assert!(out.iter().any(|c| c.source_id == "T1" && c.target_id == "S1"));
    }

    #[test]
    fn first_appearance_order_is_preserved() {
        let out = deduplicate(vec![
            conn("B", "X", 0.5, PassType::Forward),
            conn("A", "X", 0.5, PassType::Forward),
            conn("B", "X", 0.9, PassType::Backward),
        ]);
        let ids: Vec<_> = out.iter().map(|c| c.source_id.as_str()).collect();
        assert_eq!(ids, vec!["B", "A"]);
    }
}

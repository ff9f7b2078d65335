use crate::container::GameFamily;
use crate::text::Node;
use std::collections::BTreeMap;
use tracing::debug;

/// The top level gamestate keys lifted into parts of their own
pub fn split_keys(family: GameFamily) -> &'static [&'static str] {
    match family {
        GameFamily::Eu4 => &[
            "active_wars",
            "previous_wars",
            "provinces",
            "countries",
            "countries_history",
            "trade_nodes",
            "rebel_factions",
            "active_advisors",
            "map_area_data",
            "religions",
            "diplomacy",
            "inflation_statistics",
            "religion_data",
        ],
        GameFamily::Ck3 => &[
            "living",
            "dead_unprunable",
            "characters",
            "dynasties",
            "landed_titles",
            "provinces",
        ],
        GameFamily::Stellaris => &["country", "species", "galactic_object", "planets", "fleet", "ships"],
        GameFamily::Hoi4 => &["countries", "states"],
    }
}

/// Removes each key from the root and returns the removed nodes by key.
///
/// Keys that are absent are skipped. Only the first entry of a duplicated
/// key is lifted; later ones stay in the root.
///
/// ```
/// use clausewitz_save::intermediate::split;
/// use clausewitz_save::text::parse;
/// let mut root = parse(b"date=1444.11.11 provinces={ -1={ } } countries={ }")?;
/// let parts = split(&mut root, &["provinces", "countries", "diplomacy"]);
/// assert_eq!(parts.len(), 2);
/// assert_eq!(root, parse(b"date=1444.11.11")?);
/// # Ok::<(), clausewitz_save::Error>(())
/// ```
pub fn split(root: &mut Node, keys: &[&str]) -> BTreeMap<String, Node> {
    let mut result = BTreeMap::new();
    let Some(array) = root.as_array_mut() else {
        return result;
    };

    for key in keys {
        if let Some(node) = array.remove_key(key) {
            debug!(key, "lifted key out of gamestate");
            result.insert(String::from(*key), node);
        }
    }

    result
}

/// The inverse of [`split`]: moves every part named by a key back into the
/// root. Rejoined keys are appended in key order.
pub fn join(root: &mut Node, parts: &mut BTreeMap<String, Node>, keys: &[&str]) {
    let Some(array) = root.as_array_mut() else {
        return;
    };

    for key in keys {
        if let Some(node) = parts.remove(*key) {
            array.push_keyed(*key, node);
        }
    }
}

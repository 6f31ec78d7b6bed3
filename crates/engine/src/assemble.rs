use std::collections::BTreeSet;

use nutrirec_core::{Dataset, Neighbor, Recipe};

use crate::store::InstructionSource;

/// Resolves ranked rows into recipes, preserving rank order. Instructions for
/// the whole result set are fetched with a single call.
pub fn assemble_recipes<S: InstructionSource + ?Sized>(
    source: &S,
    dataset: &Dataset,
    ranked: &[Neighbor],
    return_distance: bool,
) -> Vec<Recipe> {
    let rows: BTreeSet<usize> = ranked.iter().map(|n| n.row_index).collect();
    let instructions = source.fetch_instructions(&rows);
    ranked
        .iter()
        .filter_map(|neighbor| {
            let row = dataset.row(neighbor.row_index)?;
            let text = instructions
                .get(&neighbor.row_index)
                .map(String::as_str)
                .unwrap_or("");
            let distance = return_distance.then_some(neighbor.distance);
            Some(Recipe::from_row(&row, text, distance))
        })
        .collect()
}

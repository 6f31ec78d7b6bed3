use std::fs;
use std::io::Read;
use std::path::{Path, PathBuf};

use anyhow::{anyhow, bail, Context, Result};
use csv::{ReaderBuilder, StringRecord};
use flate2::read::MultiGzDecoder;
use nutrirec_core::{
    Dataset, DatasetBuilder, NewRecipe, NutritionField, NutritionRow, Snapshot, NUTRITION_DIMS,
};
use nutrirec_engine::InstructionStore;
use tracing::{info, warn};

const INSTRUCTIONS_COLUMN: &str = "RecipeInstructions";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConvertSummary {
    pub rows: usize,
    pub snapshot_path: PathBuf,
    pub snapshot_bytes: u64,
    pub instructions_path: PathBuf,
    pub instructions_rows: usize,
    pub instructions_bytes: u64,
}

/// Header positions of the columns a recipe export must carry.
#[derive(Debug)]
struct Columns {
    name: usize,
    cook_time: usize,
    prep_time: usize,
    total_time: usize,
    ingredient_parts: usize,
    nutrition: [usize; NUTRITION_DIMS],
    food_type: usize,
    instructions: Option<usize>,
}

impl Columns {
    fn resolve(headers: &StringRecord) -> Result<Self> {
        let find = |name: &str| {
            headers
                .iter()
                .position(|h| h.trim() == name)
                .ok_or_else(|| anyhow!("missing column {name}"))
        };
        let mut nutrition = [0usize; NUTRITION_DIMS];
        for field in NutritionField::ALL {
            nutrition[field.index()] = find(field.column())?;
        }
        Ok(Self {
            name: find("Name")?,
            cook_time: find("CookTime")?,
            prep_time: find("PrepTime")?,
            total_time: find("TotalTime")?,
            ingredient_parts: find("RecipeIngredientParts")?,
            nutrition,
            food_type: find("FoodType")?,
            instructions: find(INSTRUCTIONS_COLUMN).ok(),
        })
    }
}

/// Recipes plus the instructions text split off for the secondary store.
#[derive(Debug)]
pub struct ParsedExport {
    pub dataset: Dataset,
    pub instructions: Vec<(usize, String)>,
}

/// Converts a CSV export (gzip when the name ends in `.gz`) into a snapshot
/// and an instructions store.
pub fn convert_export(
    input: &Path,
    snapshot: &Path,
    instructions: &Path,
) -> Result<ConvertSummary> {
    let parsed = read_export(input)?;
    let rows = parsed.dataset.len();
    Snapshot::save(&parsed.dataset, snapshot)?;
    let instructions_rows = InstructionStore::create(
        instructions,
        parsed.instructions.iter().map(|(row, body)| (*row, body.as_str())),
    )?;
    let summary = ConvertSummary {
        rows,
        snapshot_path: snapshot.to_path_buf(),
        snapshot_bytes: file_size(snapshot)?,
        instructions_path: instructions.to_path_buf(),
        instructions_rows,
        instructions_bytes: file_size(instructions)?,
    };
    info!(
        rows,
        instructions_rows,
        snapshot_bytes = summary.snapshot_bytes,
        instructions_bytes = summary.instructions_bytes,
        "conversion complete"
    );
    Ok(summary)
}

pub fn read_export(path: &Path) -> Result<ParsedExport> {
    let file = fs::File::open(path)
        .with_context(|| format!("failed to open export {}", path.display()))?;
    let gzip = path
        .extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| ext.eq_ignore_ascii_case("gz"));
    if gzip {
        parse_export(path, MultiGzDecoder::new(file))
    } else {
        parse_export(path, file)
    }
}

fn parse_export<R: Read>(path: &Path, reader: R) -> Result<ParsedExport> {
    let mut reader = ReaderBuilder::new().flexible(false).from_reader(reader);
    let headers = reader
        .headers()
        .with_context(|| format!("missing headers in {}", path.display()))?
        .clone();
    let columns = Columns::resolve(&headers)
        .with_context(|| format!("unexpected header in {}", path.display()))?;
    if columns.instructions.is_none() {
        warn!(path = %path.display(), "export has no {INSTRUCTIONS_COLUMN} column");
    }

    let mut builder = DatasetBuilder::default();
    let mut instructions = Vec::new();
    for (row, record) in reader.records().enumerate() {
        let record =
            record.with_context(|| format!("invalid row {row} in {}", path.display()))?;
        let recipe = recipe_from_record(&columns, &record)
            .with_context(|| format!("row {row} of {}", path.display()))?;
        let row_index = builder.push(recipe);
        let body = columns
            .instructions
            .and_then(|idx| record.get(idx))
            .unwrap_or("");
        instructions.push((row_index, body.to_string()));
    }
    Ok(ParsedExport {
        dataset: builder.build(),
        instructions,
    })
}

fn recipe_from_record(columns: &Columns, record: &StringRecord) -> Result<NewRecipe> {
    let text = |idx: usize| record.get(idx).unwrap_or("").to_string();
    let mut nutrition: NutritionRow = [0.0; NUTRITION_DIMS];
    for field in NutritionField::ALL {
        let raw = record.get(columns.nutrition[field.index()]).unwrap_or("").trim();
        let value: f32 = raw
            .parse()
            .map_err(|_| anyhow!("{} is not a number: {raw:?}", field.column()))?;
        if !value.is_finite() {
            bail!("{} is not finite: {raw:?}", field.column());
        }
        nutrition[field.index()] = value;
    }
    Ok(NewRecipe {
        name: text(columns.name),
        cook_time: text(columns.cook_time),
        prep_time: text(columns.prep_time),
        total_time: text(columns.total_time),
        ingredient_parts: text(columns.ingredient_parts),
        nutrition,
        food_type: text(columns.food_type),
    })
}

fn file_size(path: &Path) -> Result<u64> {
    Ok(fs::metadata(path)
        .with_context(|| format!("failed to stat {}", path.display()))?
        .len())
}

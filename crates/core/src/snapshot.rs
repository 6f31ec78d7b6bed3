use std::fs::File;
use std::io::{BufWriter, Read, Write};
use std::path::Path;

use prost::Message;
use tracing::info;

use crate::dataset::{Dataset, FoodTypeColumn};
use crate::error::{RecError, Result};
use crate::nutrition::{NutritionField, NutritionRow, NUTRITION_DIMS};
use crate::proto;

pub const SNAPSHOT_VERSION: u32 = 1;
const ZSTD_LEVEL: i32 = 3;

/// Columnar on-disk form of a [`Dataset`]: zstd-compressed `RecipeSnapshot`.
pub struct Snapshot;

impl Snapshot {
    pub fn to_proto(dataset: &Dataset) -> proto::RecipeSnapshot {
        let nutrition = NutritionField::ALL
            .iter()
            .map(|field| proto::NumericColumn {
                field: field.column().to_string(),
                values: dataset
                    .nutrition
                    .iter()
                    .map(|row| row[field.index()])
                    .collect(),
            })
            .collect();
        proto::RecipeSnapshot {
            version: SNAPSHOT_VERSION,
            row_count: dataset.len() as u64,
            name: dataset.names.clone(),
            cook_time: dataset.cook_times.clone(),
            prep_time: dataset.prep_times.clone(),
            total_time: dataset.total_times.clone(),
            ingredient_parts: dataset.ingredient_parts.clone(),
            nutrition,
            food_type: Some(proto::FoodTypeColumn {
                dictionary: dataset.food_types.dictionary().to_vec(),
                codes: dataset.food_types.codes().to_vec(),
            }),
        }
    }

    pub fn from_proto(snapshot: proto::RecipeSnapshot) -> Result<Dataset> {
        if snapshot.version != SNAPSHOT_VERSION {
            return Err(RecError::InvalidSnapshot(format!(
                "unsupported snapshot version {}",
                snapshot.version
            )));
        }
        let rows = usize::try_from(snapshot.row_count)
            .map_err(|_| RecError::InvalidSnapshot("row count overflows usize".into()))?;

        let mut columns: [Option<Vec<f32>>; NUTRITION_DIMS] = Default::default();
        for column in snapshot.nutrition {
            let field = NutritionField::from_column(&column.field).ok_or_else(|| {
                RecError::InvalidSnapshot(format!("unknown nutrition column {}", column.field))
            })?;
            if columns[field.index()].is_some() {
                return Err(RecError::InvalidSnapshot(format!(
                    "duplicate nutrition column {}",
                    column.field
                )));
            }
            if column.values.len() != rows {
                return Err(RecError::InvalidSnapshot(format!(
                    "column {} has {} rows, expected {rows}",
                    column.field,
                    column.values.len()
                )));
            }
            if let Some(row) = column.values.iter().position(|v| !v.is_finite()) {
                return Err(RecError::InvalidSnapshot(format!(
                    "column {} has a non-finite value at row {row}",
                    column.field
                )));
            }
            columns[field.index()] = Some(column.values);
        }
        let mut resolved = Vec::with_capacity(NUTRITION_DIMS);
        for (field, column) in NutritionField::ALL.iter().zip(columns) {
            resolved.push(column.ok_or_else(|| {
                RecError::InvalidSnapshot(format!("missing nutrition column {}", field.column()))
            })?);
        }
        let nutrition = (0..rows)
            .map(|row| {
                let mut values: NutritionRow = [0.0; NUTRITION_DIMS];
                for (dim, column) in resolved.iter().enumerate() {
                    values[dim] = column[row];
                }
                values
            })
            .collect();

        let food_type = snapshot
            .food_type
            .ok_or_else(|| RecError::InvalidSnapshot("missing food type column".into()))?;
        let dataset = Dataset {
            names: snapshot.name,
            cook_times: snapshot.cook_time,
            prep_times: snapshot.prep_time,
            total_times: snapshot.total_time,
            ingredient_parts: snapshot.ingredient_parts,
            nutrition,
            food_types: FoodTypeColumn::from_parts(food_type.dictionary, food_type.codes)?,
        };
        if dataset.len() != rows {
            return Err(RecError::InvalidSnapshot(format!(
                "name column has {} rows, header says {rows}",
                dataset.len()
            )));
        }
        dataset.validate()?;
        Ok(dataset)
    }

    pub fn to_bytes(dataset: &Dataset) -> Result<Vec<u8>> {
        let proto = Self::to_proto(dataset);
        let mut buf = Vec::with_capacity(proto.encoded_len());
        proto.encode(&mut buf)?;
        let mut encoder = zstd::stream::Encoder::new(Vec::new(), ZSTD_LEVEL)?;
        encoder.write_all(&buf)?;
        Ok(encoder.finish()?)
    }

    pub fn from_bytes(bytes: &[u8]) -> Result<Dataset> {
        let mut decoder = zstd::stream::Decoder::new(bytes)?;
        let mut buf = Vec::new();
        decoder.read_to_end(&mut buf)?;
        let proto = proto::RecipeSnapshot::decode(&*buf)?;
        Self::from_proto(proto)
    }

    pub fn save<P: AsRef<Path>>(dataset: &Dataset, path: P) -> Result<()> {
        let bytes = Self::to_bytes(dataset)?;
        let mut file = BufWriter::new(File::create(path.as_ref())?);
        file.write_all(&bytes)?;
        file.flush()?;
        info!(
            path = %path.as_ref().display(),
            rows = dataset.len(),
            bytes = bytes.len(),
            "snapshot written"
        );
        Ok(())
    }

    /// Reads a snapshot from disk. Any failure, including a missing file or a
    /// structurally inconsistent payload, is reported as `StorageUnavailable`.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Dataset> {
        let path = path.as_ref();
        let read = || -> Result<Dataset> {
            let mut file = File::open(path)?;
            let mut buf = Vec::new();
            file.read_to_end(&mut buf)?;
            Self::from_bytes(&buf)
        };
        read().map_err(|err| RecError::storage_unavailable(path, err))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dataset::NewRecipe;
    use tempfile::tempdir;

    fn sample() -> Dataset {
        (0..4)
            .map(|idx| NewRecipe {
                name: format!("recipe {idx}"),
                cook_time: "PT20M".to_string(),
                prep_time: "PT10M".to_string(),
                total_time: "PT30M".to_string(),
                ingredient_parts: format!("\"item {idx}\""),
                nutrition: [idx as f32 + 0.5; NUTRITION_DIMS],
                food_type: if idx % 2 == 0 { "Vegan" } else { "Meat" }.to_string(),
            })
            .collect()
    }

    #[test]
    fn snapshot_file_restores_dataset() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("recipes.snapshot");
        let dataset = sample();
        Snapshot::save(&dataset, &path).unwrap();
        let loaded = Snapshot::load(&path).unwrap();
        assert_eq!(loaded, dataset);
        assert_eq!(loaded.row(3).unwrap().food_type, "Meat");
    }

    #[test]
    fn numeric_columns_resolve_by_name() {
        let dataset = sample();
        let mut proto = Snapshot::to_proto(&dataset);
        proto.nutrition.reverse();
        let restored = Snapshot::from_proto(proto).unwrap();
        assert_eq!(restored.nutrition(), dataset.nutrition());
    }

    #[test]
    fn missing_numeric_column_is_rejected() {
        let mut proto = Snapshot::to_proto(&sample());
        proto.nutrition.retain(|c| c.field != "FiberContent");
        let err = Snapshot::from_proto(proto).unwrap_err();
        assert!(err.to_string().contains("FiberContent"));
    }

    #[test]
    fn ragged_columns_are_rejected() {
        let mut proto = Snapshot::to_proto(&sample());
        proto.cook_time.pop();
        assert!(matches!(
            Snapshot::from_proto(proto),
            Err(RecError::InvalidSnapshot(_))
        ));
    }

    #[test]
    fn duplicate_numeric_column_is_rejected() {
        let mut proto = Snapshot::to_proto(&sample());
        let mut copy = proto.nutrition[0].clone();
        copy.values.iter_mut().for_each(|v| *v += 100.0);
        proto.nutrition.push(copy);
        let err = Snapshot::from_proto(proto).unwrap_err();
        assert!(matches!(err, RecError::InvalidSnapshot(_)));
        assert!(err.to_string().contains("duplicate"));
    }

    #[test]
    fn non_finite_values_fail_the_load() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("nan.snapshot");
        let mut proto = Snapshot::to_proto(&sample());
        proto.nutrition[2].values[1] = f32::NAN;
        let mut encoder = zstd::stream::Encoder::new(Vec::new(), ZSTD_LEVEL).unwrap();
        encoder.write_all(&proto.encode_to_vec()).unwrap();
        std::fs::write(&path, encoder.finish().unwrap()).unwrap();

        let err = Snapshot::load(&path).unwrap_err();
        assert!(matches!(err, RecError::StorageUnavailable { .. }));
        assert!(err.to_string().contains("non-finite"));
    }

    #[test]
    fn missing_file_is_storage_unavailable() {
        let dir = tempdir().unwrap();
        let err = Snapshot::load(dir.path().join("absent.snapshot")).unwrap_err();
        assert!(matches!(err, RecError::StorageUnavailable { .. }));
    }

    #[test]
    fn corrupt_file_is_storage_unavailable() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("broken.snapshot");
        std::fs::write(&path, b"definitely not zstd").unwrap();
        let err = Snapshot::load(&path).unwrap_err();
        assert!(matches!(err, RecError::StorageUnavailable { .. }));
    }
}

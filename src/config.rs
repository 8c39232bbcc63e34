// src/config.rs

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::{
    collections::BTreeMap,
    fs,
    path::{Path, PathBuf},
};

/// Every tunable of the pipeline. Defaults reproduce the COVID / crime /
/// cattle-inventory run; any field can be overridden from a YAML file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    /// Seed for defect injection.
    pub seed: u64,
    pub inject: InjectConfig,
    pub clean: CleanConfig,
    pub enrich: EnrichConfig,
    pub sources: SourcesConfig,
    pub paths: PathsConfig,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct InjectConfig {
    pub duplicate_fraction: f64,
    pub null_fraction: f64,
    pub null_columns: Vec<String>,
    pub sentinel_column: String,
    pub sentinel_marker: String,
    pub sentinel_fraction: f64,
    pub type_fraction: f64,
    pub type_columns: Vec<String>,
    pub copied_columns: Vec<ColumnCopy>,
    pub filler_columns: Vec<FillerColumn>,
}

/// `target` becomes a verbatim copy of `source`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ColumnCopy {
    pub source: String,
    pub target: String,
}

/// A column holding the same string in every row.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FillerColumn {
    pub name: String,
    pub value: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CleanConfig {
    /// Coerced to numbers and median-imputed.
    pub numeric_columns: Vec<String>,
    pub sentinel_column: String,
    pub sentinel_fill: String,
    /// Redundant and junk columns removed when present.
    pub drop_columns: Vec<String>,
    /// Raw source name → canonical name.
    pub rename: BTreeMap<String, String>,
    /// Row-wise percentage columns, computed after renaming.
    pub ratios: Vec<RatioColumn>,
}

/// `output = numerator / denominator * 100`, or 0 when the denominator is
/// absent or not positive.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RatioColumn {
    pub output: String,
    pub numerator: String,
    pub denominator: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EnrichConfig {
    pub join_key: String,
    /// Numeric columns of external B to coerce and median-impute.
    pub numeric_columns: Vec<String>,
    /// Head sample taken from the base and the joined table.
    pub sample_size: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SourcesConfig {
    pub covid_url: String,
    pub crimes_csv: PathBuf,
    pub crimes_rename: BTreeMap<String, String>,
    pub bovinos_url: String,
    pub bovinos_rename: BTreeMap<String, String>,
    pub max_retries: usize,
    pub retry_delay_ms: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PathsConfig {
    pub output_dir: PathBuf,
}

impl PathsConfig {
    pub fn store_dir(&self) -> PathBuf {
        self.output_dir.join("store")
    }

    pub fn csv_dir(&self) -> PathBuf {
        self.output_dir.join("csv")
    }

    pub fn audit_dir(&self) -> PathBuf {
        self.output_dir.join("audit")
    }
}

fn owned(names: &[&str]) -> Vec<String> {
    names.iter().map(|s| s.to_string()).collect()
}

fn mapping(pairs: &[(&str, &str)]) -> BTreeMap<String, String> {
    pairs
        .iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect()
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            seed: 42,
            inject: InjectConfig::default(),
            clean: CleanConfig::default(),
            enrich: EnrichConfig::default(),
            sources: SourcesConfig::default(),
            paths: PathsConfig::default(),
        }
    }
}

impl Default for InjectConfig {
    fn default() -> Self {
        Self {
            duplicate_fraction: 0.20,
            null_fraction: 0.05,
            null_columns: owned(&["positive", "death", "hospitalizedCurrently"]),
            sentinel_column: "registro_nulo".into(),
            sentinel_marker: "Dato Faltante".into(),
            sentinel_fraction: 0.20,
            type_fraction: 0.07,
            type_columns: owned(&["positive"]),
            copied_columns: vec![
                ColumnCopy {
                    source: "date".into(),
                    target: "fecha_duplicada".into(),
                },
                ColumnCopy {
                    source: "positive".into(),
                    target: "positive_duplicada".into(),
                },
            ],
            filler_columns: vec![FillerColumn {
                name: "columna_inutil".into(),
                value: "valor_repetido_en_todos".into(),
            }],
        }
    }
}

impl Default for CleanConfig {
    fn default() -> Self {
        Self {
            numeric_columns: owned(&["positive", "death", "hospitalizedCurrently"]),
            sentinel_column: "registro_nulo".into(),
            sentinel_fill: "Sin Dato".into(),
            drop_columns: owned(&[
                "fecha_duplicada",
                "positive_duplicada",
                "columna_inutil",
                "registro_nulo",
            ]),
            rename: mapping(&[
                ("date", "fecha"),
                ("positive", "casos_positivos"),
                ("death", "fallecidos"),
                ("hospitalizedCurrently", "hospitalizados"),
                ("totalTestResults", "total_resultados"),
                ("positiveIncrease", "incremento_positivos"),
                ("deathIncrease", "incremento_fallecidos"),
            ]),
            ratios: vec![
                RatioColumn {
                    output: "tasa_positividad".into(),
                    numerator: "casos_positivos".into(),
                    denominator: "total_resultados".into(),
                },
                RatioColumn {
                    output: "tasa_mortalidad".into(),
                    numerator: "fallecidos".into(),
                    denominator: "casos_positivos".into(),
                },
            ],
        }
    }
}

impl Default for EnrichConfig {
    fn default() -> Self {
        Self {
            join_key: "municipio".into(),
            numeric_columns: owned(&[
                "pasto_mejorado",
                "pasto_natural",
                "pasto_corte",
                "total_pastos",
            ]),
            sample_size: 444,
        }
    }
}

impl Default for SourcesConfig {
    fn default() -> Self {
        Self {
            covid_url: "https://api.covidtracking.com/v1/us/daily.json".into(),
            crimes_csv: PathBuf::from("data/Delitos_Informaticos.csv"),
            crimes_rename: mapping(&[
                ("CRIMINALIDAD", "criminalidad"),
                ("ES_ARCHIVO", "es_archivo"),
                ("ES_PRECLUSIÓN", "es_preclusion"),
                ("ESTADO", "estado"),
                ("ETAPA_CASO", "etapa_caso"),
                ("LEY", "ley"),
                ("PAÍS_HECHO", "pais_hecho"),
                ("DEPARTAMENTO_HECHO", "departamento_hecho"),
                ("MUNICIPIO_HECHO", "municipio"),
                ("SECCIONAL", "seccional"),
                ("AÑO_HECHOS", "a_o_hechos"),
                ("AÑO_ENTRADA", "a_o_entrada"),
                ("AÑO_DENUNCIA", "a_o_denuncia"),
                ("DELITO", "delito"),
                ("GRUPO_DELITO", "grupo_delito"),
                ("CONSUMADO", "consumado"),
                ("TOTAL_PROCESOS", "total_procesos"),
            ]),
            bovinos_url: "https://www.datos.gov.co/resource/fy9z-8zxt.json".into(),
            bovinos_rename: mapping(&[
                ("MUNICIPIO", "municipio"),
                ("Total Pastos (ha)", "total_pastos"),
            ]),
            max_retries: 3,
            retry_delay_ms: 1_000,
        }
    }
}

impl Default for PathsConfig {
    fn default() -> Self {
        Self {
            output_dir: PathBuf::from("static"),
        }
    }
}

impl PipelineConfig {
    /// Load from a YAML file, or fall back to defaults when no path is given.
    /// Fields absent from the file keep their defaults.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let Some(path) = path else {
            return Ok(Self::default());
        };
        let text = fs::read_to_string(path)
            .with_context(|| format!("reading config {}", path.display()))?;
        serde_yaml::from_str(&text).with_context(|| format!("parsing config {}", path.display()))
    }
}

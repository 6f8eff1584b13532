use serde::Deserialize;

#[derive(Debug, Deserialize, Clone)]
#[serde(deny_unknown_fields)]
pub struct MonosaccharideFile {
    #[serde(default, rename = "monosaccharide")]
    pub entries: Vec<MonosaccharideRecord>,
}

#[derive(Debug, Deserialize, Clone)]
#[serde(deny_unknown_fields)]
pub struct MonosaccharideRecord {
    pub stem: String,
    pub code: String,
    #[serde(default)]
    pub ketose: bool,
    #[serde(default)]
    pub deoxy: Vec<String>,
}

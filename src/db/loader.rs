use super::store::MonosaccharideDb;

pub fn load_builtin() -> MonosaccharideDb {
    let mut db = MonosaccharideDb::default();

    macro_rules! load_table {
        ($path:literal) => {
            let content = include_str!(concat!("../../templates/glycans/", $path));
            db.extend_from_toml(content)
                .unwrap_or_else(|e| panic!("Failed to load monosaccharide table '{}': {}", $path, e));
        };
    }

    load_table!("aldohexoses.toml");
    load_table!("aldopentoses.toml");
    load_table!("ketoses.toml");
    load_table!("deoxy.toml");

    db
}

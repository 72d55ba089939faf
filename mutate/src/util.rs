use std::path::PathBuf;

pub(crate) fn get_toml_config_file(dir: &str, name: &str) -> Option<PathBuf> {
    let mut path_buf = get_base_dir(dir)?;
    path_buf.push(format!("config/{name}.toml"));
    Some(path_buf)
}

pub(crate) fn get_collections_dir(root_dir: &str, collections_dir: Option<&str>) -> Option<PathBuf> {
    match collections_dir {
        Some(dir) => get_base_dir(dir),
        None => {
            let mut path_buf = get_base_dir(root_dir)?;
            path_buf.push("collections");
            Some(path_buf)
        }
    }
}

/// Expands a leading `~/` to the home directory
pub(crate) fn get_base_dir(dir: &str) -> Option<PathBuf> {
    let mut path_buf = PathBuf::new();
    if let Some(rest) = dir.strip_prefix("~/") {
        path_buf.push(dirs::home_dir()?);
        path_buf.push(rest);
    } else {
        path_buf.push(dir);
    }
    Some(path_buf)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_get_collections_dir() {
        assert_eq!(
            get_collections_dir("/srv/mutate", None),
            Some(PathBuf::from("/srv/mutate/collections"))
        );
        assert_eq!(
            get_collections_dir("/srv/mutate", Some("/defs")),
            Some(PathBuf::from("/defs"))
        );
        assert_eq!(
            get_toml_config_file("/srv/mutate", "config"),
            Some(PathBuf::from("/srv/mutate/config/config.toml"))
        );
    }
}

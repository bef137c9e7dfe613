use std::{
    borrow::Cow,
    collections::{HashMap, HashSet},
    convert::TryFrom,
    path::PathBuf,
};

use anyhow::Context;

use crate::core::color::Color;

/// Typed key-value view over one JSON object of the scene description.
///
/// Getter names track the accessed keys so `check_unused_keys` can warn
/// about typos in scene files.
pub struct InputParams {
    params: HashMap<String, InputParamsValue>,
    name: Cow<'static, str>,
    visited: HashSet<String>,
    base_path: PathBuf,
}

pub enum InputParamsValue {
    Int(i64),
    Float(f32),
    Bool(bool),
    String(String),
    Array(Vec<InputParamsValue>),
}

macro_rules! params_get {
    ( $( ( $name:ident, $type:ty, $variant:ident, $hint:expr ) ),+ $(,)? ) => {
        $(
            paste::paste! {
                pub fn [<get_ $name>](&mut self, key: &str) -> anyhow::Result<$type> {
                    if let Some(value) = self.params.get(key) {
                        if let InputParamsValue::$variant(value) = value {
                            self.visited.insert(key.to_owned());
                            return Ok(*value);
                        }
                        anyhow::bail!("{} - '{}' should be {}", self.name, key, $hint);
                    }
                    anyhow::bail!("{} - there is no '{}' field", self.name, key);
                }

                pub fn [<get_ $name _or>](&mut self, key: &str, fallback: $type) -> $type {
                    if self.params.contains_key(key) {
                        self.[<get_ $name>](key).unwrap_or(fallback)
                    } else {
                        fallback
                    }
                }
            }
        )+
    };
}

impl InputParams {
    pub fn set_name(&mut self, name: Cow<'static, str>) {
        self.name = name;
    }

    pub fn name(&self) -> &str {
        self.name.as_ref()
    }

    pub fn set_base_path(&mut self, path: PathBuf) {
        self.base_path = path;
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.params.contains_key(key)
    }

    params_get! {
        (int, i64, Int, "integer"),
        (bool, bool, Bool, "boolean"),
    }

    pub fn get_float(&mut self, key: &str) -> anyhow::Result<f32> {
        if let Some(value) = self.params.get(key) {
            let value = match value {
                InputParamsValue::Float(v) => *v,
                InputParamsValue::Int(v) => *v as f32,
                _ => anyhow::bail!("{} - '{}' should be a number", self.name, key),
            };
            self.visited.insert(key.to_owned());
            return Ok(value);
        }
        anyhow::bail!("{} - there is no '{}' field", self.name, key);
    }

    pub fn get_float_or(&mut self, key: &str, fallback: f32) -> f32 {
        if self.params.contains_key(key) {
            self.get_float(key).unwrap_or(fallback)
        } else {
            fallback
        }
    }

    pub fn get_float3(&mut self, key: &str) -> anyhow::Result<[f32; 3]> {
        let arr = self.get_float_array(key, 3)?;
        Ok([arr[0], arr[1], arr[2]])
    }

    pub fn get_float3_or(&mut self, key: &str, fallback: [f32; 3]) -> [f32; 3] {
        if self.params.contains_key(key) {
            self.get_float3(key).unwrap_or(fallback)
        } else {
            fallback
        }
    }

    fn get_float_array(&mut self, key: &str, len: usize) -> anyhow::Result<Vec<f32>> {
        if let Some(value) = self.params.get(key) {
            if let InputParamsValue::Array(arr) = value {
                if arr.len() == len {
                    let mut result = Vec::with_capacity(len);
                    for v in arr {
                        match v {
                            InputParamsValue::Float(f) => result.push(*f),
                            InputParamsValue::Int(i) => result.push(*i as f32),
                            _ => anyhow::bail!(
                                "{} - '{}' should be an array of {} floats",
                                self.name,
                                key,
                                len
                            ),
                        }
                    }
                    self.visited.insert(key.to_owned());
                    return Ok(result);
                }
            }
            anyhow::bail!("{} - '{}' should be an array of {} floats", self.name, key, len);
        }
        anyhow::bail!("{} - there is no '{}' field", self.name, key);
    }

    pub fn get_matrix(&mut self, key: &str) -> anyhow::Result<glam::Mat4> {
        let arr = self.get_float_array(key, 16)?;
        // Row-major input, like the usual scene file convention.
        Ok(glam::Mat4::from_cols_array(&[
            arr[0], arr[4], arr[8], arr[12], //
            arr[1], arr[5], arr[9], arr[13], //
            arr[2], arr[6], arr[10], arr[14], //
            arr[3], arr[7], arr[11], arr[15],
        ]))
    }

    pub fn get_str(&mut self, key: &str) -> anyhow::Result<String> {
        if let Some(value) = self.params.get(key) {
            if let InputParamsValue::String(value) = value {
                self.visited.insert(key.to_owned());
                return Ok(value.clone());
            }
            anyhow::bail!("{} - '{}' should be string", self.name, key);
        }
        anyhow::bail!("{} - there is no '{}' field", self.name, key);
    }

    pub fn get_str_or(&mut self, key: &str, fallback: &str) -> String {
        if self.params.contains_key(key) {
            self.get_str(key).unwrap_or_else(|_| fallback.to_owned())
        } else {
            fallback.to_owned()
        }
    }

    pub fn get_file_path(&mut self, key: &str) -> anyhow::Result<PathBuf> {
        let filename = self.get_str(key)?;
        Ok(self.base_path.with_file_name(filename))
    }

    pub fn get_image(&mut self, key: &str) -> anyhow::Result<image::DynamicImage> {
        let path = self.get_file_path(key)?;
        image::open(&path).context(format!(
            "{} - can't read image '{}'",
            self.name,
            path.display()
        ))
    }

    pub fn get_exr_image(&mut self, key: &str) -> anyhow::Result<Vec<Vec<Color>>> {
        let path = self.get_file_path(key)?;
        Ok(exr::image::read::read_first_rgba_layer_from_file(
            &path,
            |resolution: exr::math::Vec2<usize>, _| {
                vec![vec![Color::BLACK; resolution.width()]; resolution.height()]
            },
            |image, pos, (r, g, b, _): (f32, f32, f32, f32)| {
                image[pos.height()][pos.width()] = Color::new(r, g, b)
            },
        )?
        .layer_data
        .channel_data
        .pixels)
    }

    pub fn check_unused_keys(&self) {
        for k in self.params.keys() {
            if !k.starts_with('#') && !self.visited.contains(k) {
                log::warn!("{} - unused key '{}'", self.name, k);
            }
        }
    }
}

impl TryFrom<&serde_json::Value> for InputParamsValue {
    type Error = anyhow::Error;

    fn try_from(value: &serde_json::Value) -> Result<Self, Self::Error> {
        match value {
            serde_json::Value::Bool(v) => Ok(Self::Bool(*v)),
            serde_json::Value::Number(v) => {
                if let Some(v) = v.as_i64() {
                    Ok(Self::Int(v))
                } else {
                    Ok(Self::Float(v.as_f64().unwrap_or(0.0) as f32))
                }
            }
            serde_json::Value::String(v) => Ok(Self::String(v.clone())),
            serde_json::Value::Array(arr) => {
                let mut values = Vec::with_capacity(arr.len());
                for v in arr {
                    values.push(InputParamsValue::try_from(v)?);
                }
                Ok(Self::Array(values))
            }
            _ => anyhow::bail!("unsupported json value for a parameter"),
        }
    }
}

impl TryFrom<&serde_json::Value> for InputParams {
    type Error = anyhow::Error;

    fn try_from(value: &serde_json::Value) -> Result<Self, Self::Error> {
        if let serde_json::Value::Object(value) = value {
            let mut params = HashMap::with_capacity(value.len());
            for (k, v) in value {
                let v = InputParamsValue::try_from(v)
                    .context(format!("can't convert member '{}'", k))?;
                params.insert(k.clone(), v);
            }
            Ok(Self {
                params,
                name: Cow::Borrowed(""),
                visited: HashSet::new(),
                base_path: PathBuf::default(),
            })
        } else {
            anyhow::bail!("parameters must be a json object");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::convert::TryInto;

    fn params(json: &str) -> InputParams {
        let value: serde_json::Value = serde_json::from_str(json).unwrap();
        (&value).try_into().unwrap()
    }

    #[test]
    fn typed_getters() {
        let mut p = params(r#"{"n": 3, "f": 1.5, "b": true, "s": "pt", "v": [1, 2.0, 3]}"#);
        assert_eq!(p.get_int("n").unwrap(), 3);
        assert_eq!(p.get_float("f").unwrap(), 1.5);
        assert!(p.get_bool("b").unwrap());
        assert_eq!(p.get_str("s").unwrap(), "pt");
        assert_eq!(p.get_float3("v").unwrap(), [1.0, 2.0, 3.0]);
    }

    #[test]
    fn fallbacks_apply_on_missing_keys() {
        let mut p = params(r#"{}"#);
        assert_eq!(p.get_int_or("n", 7), 7);
        assert_eq!(p.get_str_or("mode", "mis"), "mis");
        assert_eq!(p.get_float3_or("Kd", [1.0, 1.0, 1.0]), [1.0, 1.0, 1.0]);
    }

    #[test]
    fn wrong_types_error() {
        let mut p = params(r#"{"n": "three"}"#);
        assert!(p.get_int("n").is_err());
    }
}

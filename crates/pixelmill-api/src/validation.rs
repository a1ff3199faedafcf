//! Request option parsing for the image routes
//!
//! Multipart text fields arrive as strings. Each route declares a field
//! schema; values are coerced to JSON (numbers, booleans, objects),
//! checked against enum and pattern constraints, deserialized into a
//! request struct and finally range-checked with `validator`. Every failure
//! is collected so the client sees all bad fields at once. Fields not in the
//! schema are dropped.

use std::collections::BTreeMap;

use pixelmill_core::{AppError, FieldError};
use pixelmill_processing::{
    CompressOptions, ConvertOptions, CropRegion, EnhanceOptions, FitMode, HexColor, MatteFormat,
    OutputFormat, RemoveBackgroundOptions, Rotation, TransformOptions, WatermarkOptions,
    WatermarkPosition,
};
use regex::Regex;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::{Map, Value};
use validator::Validate;

const HEX_COLOR_PATTERN: &str = r"(?i)^#[0-9A-F]{6}$";

const COMPRESS_FORMATS: &[&str] = &["jpeg", "jpg", "png", "webp"];
const CONVERT_FORMATS: &[&str] = &["jpeg", "jpg", "png", "webp", "avif", "tiff", "bmp"];
const FIT_MODES: &[&str] = &["cover", "contain", "fill", "inside", "outside"];
const ROTATIONS: &[f64] = &[0.0, 90.0, 180.0, 270.0];
const POSITIONS: &[&str] = &[
    "center",
    "top",
    "bottom",
    "left",
    "right",
    "top-left",
    "top-right",
    "bottom-left",
    "bottom-right",
];
const MATTE_FORMATS: &[&str] = &["png", "webp"];

#[derive(Debug, Clone, Copy)]
enum FieldKind {
    Text,
    Number,
    Boolean,
    Object,
    OneOf(&'static [&'static str]),
    NumberOneOf(&'static [f64]),
    Pattern(&'static str),
}

#[derive(Debug, Clone, Copy)]
pub(crate) struct FieldSpec {
    name: &'static str,
    kind: FieldKind,
    required: bool,
}

const fn field(name: &'static str, kind: FieldKind) -> FieldSpec {
    FieldSpec {
        name,
        kind,
        required: false,
    }
}

const fn required(name: &'static str, kind: FieldKind) -> FieldSpec {
    FieldSpec {
        name,
        kind,
        required: true,
    }
}

const COMPRESS_SCHEMA: &[FieldSpec] = &[
    field("quality", FieldKind::Number),
    field("format", FieldKind::OneOf(COMPRESS_FORMATS)),
];

const CONVERT_SCHEMA: &[FieldSpec] = &[
    required("format", FieldKind::OneOf(CONVERT_FORMATS)),
    field("quality", FieldKind::Number),
];

const TRANSFORM_SCHEMA: &[FieldSpec] = &[
    field("width", FieldKind::Number),
    field("height", FieldKind::Number),
    field("fit", FieldKind::OneOf(FIT_MODES)),
    field("rotate", FieldKind::NumberOneOf(ROTATIONS)),
    field("flip", FieldKind::Boolean),
    field("flop", FieldKind::Boolean),
    field("crop", FieldKind::Object),
];

const WATERMARK_SCHEMA: &[FieldSpec] = &[
    field("text", FieldKind::Text),
    field("position", FieldKind::OneOf(POSITIONS)),
    field("opacity", FieldKind::Number),
    field("fontSize", FieldKind::Number),
    field("fontColor", FieldKind::Pattern(HEX_COLOR_PATTERN)),
    field("backgroundColor", FieldKind::Pattern(HEX_COLOR_PATTERN)),
];

const ENHANCE_SCHEMA: &[FieldSpec] = &[
    field("scale", FieldKind::Number),
    field("denoise", FieldKind::Boolean),
    field("sharpen", FieldKind::Boolean),
];

const REMOVE_BACKGROUND_SCHEMA: &[FieldSpec] = &[
    field("outputFormat", FieldKind::OneOf(MATTE_FORMATS)),
    field("backgroundColor", FieldKind::Pattern(HEX_COLOR_PATTERN)),
];

/// A request struct with a known multipart field schema
pub(crate) trait OptionsRequest: DeserializeOwned + Validate + Sized {
    fn schema() -> &'static [FieldSpec];

    fn from_fields(fields: &BTreeMap<String, String>) -> Result<Self, AppError> {
        parse_fields(fields, Self::schema())
    }
}

fn list(values: &[&str]) -> String {
    values.join(", ")
}

fn parse_number(raw: &str) -> Option<Value> {
    let n: f64 = raw.trim().parse().ok()?;
    if !n.is_finite() {
        return None;
    }
    serde_json::Number::from_f64(n).map(Value::Number)
}

fn parse_boolean(raw: &str) -> Option<Value> {
    match raw.trim().to_lowercase().as_str() {
        "true" => Some(Value::Bool(true)),
        "false" => Some(Value::Bool(false)),
        _ => None,
    }
}

/// Coerce one raw text field per its kind
fn coerce(spec: &FieldSpec, raw: &str) -> Result<Result<Value, FieldError>, AppError> {
    let name = spec.name;
    let invalid = |message: String| Ok(Err(FieldError::new(name, message)));

    if raw.is_empty() {
        return invalid(format!("\"{}\" is not allowed to be empty", name));
    }

    match spec.kind {
        FieldKind::Text => Ok(Ok(Value::String(raw.to_string()))),
        FieldKind::Number => match parse_number(raw) {
            Some(value) => Ok(Ok(value)),
            None => invalid(format!("\"{}\" must be a number", name)),
        },
        FieldKind::Boolean => match parse_boolean(raw) {
            Some(value) => Ok(Ok(value)),
            None => invalid(format!("\"{}\" must be a boolean", name)),
        },
        FieldKind::Object => match serde_json::from_str::<Value>(raw) {
            Ok(value @ Value::Object(_)) => Ok(Ok(value)),
            _ => invalid(format!("\"{}\" must be of type object", name)),
        },
        FieldKind::OneOf(allowed) => {
            if allowed.contains(&raw) {
                Ok(Ok(Value::String(raw.to_string())))
            } else {
                invalid(format!("\"{}\" must be one of [{}]", name, list(allowed)))
            }
        }
        FieldKind::NumberOneOf(allowed) => {
            let n = raw.trim().parse::<f64>().ok();
            match n.filter(|n| allowed.contains(n)).and_then(serde_json::Number::from_f64) {
                Some(number) => Ok(Ok(Value::Number(number))),
                None => {
                    let options: Vec<String> = allowed.iter().map(|v| v.to_string()).collect();
                    invalid(format!("\"{}\" must be one of [{}]", name, options.join(", ")))
                }
            }
        }
        FieldKind::Pattern(pattern) => {
            let re = Regex::new(pattern)
                .map_err(|e| AppError::Internal(format!("Invalid field pattern: {}", e)))?;
            if re.is_match(raw) {
                Ok(Ok(Value::String(raw.to_string())))
            } else {
                invalid(format!(
                    "\"{}\" with value \"{}\" fails to match the required pattern: #RRGGBB",
                    name, raw
                ))
            }
        }
    }
}

fn parse_fields<T>(fields: &BTreeMap<String, String>, schema: &[FieldSpec]) -> Result<T, AppError>
where
    T: DeserializeOwned + Validate,
{
    let mut object = Map::new();
    let mut errors = Vec::new();

    for spec in schema {
        match fields.get(spec.name) {
            Some(raw) => match coerce(spec, raw)? {
                Ok(value) => {
                    object.insert(spec.name.to_string(), value);
                }
                Err(err) => errors.push(err),
            },
            None if spec.required => {
                errors.push(FieldError::new(
                    spec.name,
                    format!("\"{}\" is required", spec.name),
                ));
            }
            None => {}
        }
    }

    match serde_json::from_value::<T>(Value::Object(object)) {
        Ok(request) => {
            if let Err(invalid) = request.validate() {
                errors.extend(AppError::from(invalid).field_errors().iter().cloned());
            }
            if errors.is_empty() {
                return Ok(request);
            }
        }
        // Coercion failures already explain why the struct could not be built
        Err(err) if errors.is_empty() => return Err(err.into()),
        Err(_) => {}
    }

    errors.sort_by(|a, b| a.field.cmp(&b.field));
    Err(AppError::Validation(errors))
}

fn default_compress_quality() -> f64 {
    80.0
}

fn default_convert_quality() -> f64 {
    90.0
}

fn default_fit() -> String {
    "cover".to_string()
}

fn default_position() -> String {
    "bottom-right".to_string()
}

fn default_opacity() -> f64 {
    0.8
}

fn default_font_size() -> f64 {
    20.0
}

fn default_font_color() -> String {
    "#FFFFFF".to_string()
}

fn default_output_format() -> String {
    "png".to_string()
}

fn default_scale() -> f64 {
    2.0
}

fn default_true() -> bool {
    true
}

/// Values reaching this point already passed the pattern check
fn color(value: &str) -> Result<HexColor, AppError> {
    HexColor::parse(value)
        .ok_or_else(|| AppError::InvalidInput(format!("Invalid color '{}'", value)))
}

fn quality(value: f64) -> u8 {
    value.round().clamp(1.0, 100.0) as u8
}

fn dimension(value: f64) -> u32 {
    value.round().max(1.0) as u32
}

#[derive(Debug, Deserialize, Validate)]
pub struct CompressRequest {
    #[serde(default = "default_compress_quality")]
    #[validate(range(min = 1.0, max = 100.0, message = "\"quality\" must be between 1 and 100"))]
    pub quality: f64,
    pub format: Option<String>,
}

impl OptionsRequest for CompressRequest {
    fn schema() -> &'static [FieldSpec] {
        COMPRESS_SCHEMA
    }
}

impl CompressRequest {
    pub fn into_options(self) -> Result<CompressOptions, AppError> {
        let format = self
            .format
            .as_deref()
            .map(OutputFormat::parse)
            .transpose()?;
        Ok(CompressOptions {
            quality: quality(self.quality),
            format,
        })
    }
}

#[derive(Debug, Deserialize, Validate)]
pub struct ConvertRequest {
    pub format: String,
    #[serde(default = "default_convert_quality")]
    #[validate(range(min = 1.0, max = 100.0, message = "\"quality\" must be between 1 and 100"))]
    pub quality: f64,
}

impl OptionsRequest for ConvertRequest {
    fn schema() -> &'static [FieldSpec] {
        CONVERT_SCHEMA
    }
}

impl ConvertRequest {
    pub fn into_options(self) -> Result<ConvertOptions, AppError> {
        Ok(ConvertOptions {
            format: OutputFormat::parse(&self.format)?,
            quality: quality(self.quality),
        })
    }
}

#[derive(Debug, Deserialize, Validate)]
pub struct CropRequest {
    #[validate(
        required(message = "\"crop.left\" is required"),
        range(min = 0.0, message = "\"crop.left\" must be greater than or equal to 0")
    )]
    pub left: Option<f64>,
    #[validate(
        required(message = "\"crop.top\" is required"),
        range(min = 0.0, message = "\"crop.top\" must be greater than or equal to 0")
    )]
    pub top: Option<f64>,
    #[validate(
        required(message = "\"crop.width\" is required"),
        range(min = 1.0, message = "\"crop.width\" must be greater than or equal to 1")
    )]
    pub width: Option<f64>,
    #[validate(
        required(message = "\"crop.height\" is required"),
        range(min = 1.0, message = "\"crop.height\" must be greater than or equal to 1")
    )]
    pub height: Option<f64>,
}

impl CropRequest {
    fn region(&self) -> CropRegion {
        let px = |v: Option<f64>| v.unwrap_or_default().round().max(0.0) as u32;
        CropRegion {
            left: px(self.left),
            top: px(self.top),
            width: px(self.width),
            height: px(self.height),
        }
    }
}

#[derive(Debug, Deserialize, Validate)]
pub struct TransformRequest {
    #[validate(range(min = 1.0, max = 10000.0, message = "\"width\" must be between 1 and 10000"))]
    pub width: Option<f64>,
    #[validate(range(min = 1.0, max = 10000.0, message = "\"height\" must be between 1 and 10000"))]
    pub height: Option<f64>,
    #[serde(default = "default_fit")]
    pub fit: String,
    pub rotate: Option<f64>,
    #[serde(default)]
    pub flip: bool,
    #[serde(default)]
    pub flop: bool,
    #[validate(nested)]
    pub crop: Option<CropRequest>,
}

impl OptionsRequest for TransformRequest {
    fn schema() -> &'static [FieldSpec] {
        TRANSFORM_SCHEMA
    }
}

impl TransformRequest {
    pub fn into_options(self) -> Result<TransformOptions, AppError> {
        let fit = FitMode::parse(&self.fit)
            .ok_or_else(|| AppError::InvalidInput(format!("Unknown fit '{}'", self.fit)))?;
        let rotate = self
            .rotate
            .map(|deg| Rotation::try_from(deg as u16))
            .transpose()?;

        Ok(TransformOptions {
            width: self.width.map(dimension),
            height: self.height.map(dimension),
            fit,
            rotate,
            flip: self.flip,
            flop: self.flop,
            crop: self.crop.as_ref().map(CropRequest::region),
        })
    }
}

#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct WatermarkRequest {
    #[validate(length(
        max = 100,
        message = "\"text\" length must be less than or equal to 100 characters long"
    ))]
    pub text: Option<String>,
    #[serde(default = "default_position")]
    pub position: String,
    #[serde(default = "default_opacity")]
    #[validate(range(min = 0.0, max = 1.0, message = "\"opacity\" must be between 0 and 1"))]
    pub opacity: f64,
    #[serde(default = "default_font_size")]
    #[validate(range(min = 10.0, max = 200.0, message = "\"fontSize\" must be between 10 and 200"))]
    pub font_size: f64,
    #[serde(default = "default_font_color")]
    pub font_color: String,
    pub background_color: Option<String>,
}

impl OptionsRequest for WatermarkRequest {
    fn schema() -> &'static [FieldSpec] {
        WATERMARK_SCHEMA
    }
}

impl WatermarkRequest {
    pub fn into_options(self) -> Result<WatermarkOptions, AppError> {
        let position = WatermarkPosition::parse(&self.position).ok_or_else(|| {
            AppError::InvalidInput(format!("Unknown position '{}'", self.position))
        })?;

        Ok(WatermarkOptions {
            text: self.text,
            position,
            opacity: self.opacity as f32,
            font_size: self.font_size.round() as u32,
            font_color: color(&self.font_color)?,
            background_color: self.background_color.as_deref().map(color).transpose()?,
        })
    }
}

#[derive(Debug, Deserialize, Validate)]
pub struct EnhanceRequest {
    #[serde(default = "default_scale")]
    #[validate(range(min = 1.0, max = 4.0, message = "\"scale\" must be between 1 and 4"))]
    pub scale: f64,
    #[serde(default = "default_true")]
    pub denoise: bool,
    #[serde(default)]
    pub sharpen: bool,
}

impl OptionsRequest for EnhanceRequest {
    fn schema() -> &'static [FieldSpec] {
        ENHANCE_SCHEMA
    }
}

impl EnhanceRequest {
    pub fn into_options(self) -> EnhanceOptions {
        EnhanceOptions {
            scale: self.scale as f32,
            denoise: self.denoise,
            sharpen: self.sharpen,
        }
    }
}

#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct RemoveBackgroundRequest {
    #[serde(default = "default_output_format")]
    pub output_format: String,
    pub background_color: Option<String>,
}

impl OptionsRequest for RemoveBackgroundRequest {
    fn schema() -> &'static [FieldSpec] {
        REMOVE_BACKGROUND_SCHEMA
    }
}

impl RemoveBackgroundRequest {
    pub fn into_options(self) -> Result<RemoveBackgroundOptions, AppError> {
        let output_format = match self.output_format.as_str() {
            "webp" => MatteFormat::Webp,
            _ => MatteFormat::Png,
        };
        Ok(RemoveBackgroundOptions {
            output_format,
            background_color: self.background_color.as_deref().map(color).transpose()?,
        })
    }
}

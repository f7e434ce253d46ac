//! 属性值模型与类型转换。
//!
//! [`PropertyValue`] 是固定种类集合上的标签联合。不同种类之间的转换必须显式调用
//! [`convert`]，失败时返回 [`ConversionError`]，调用方据此拒绝编辑而不是写入错误值。

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::entity::EntityId;
use crate::geometry::{Color, Point, PointF, Rect, RectF, Size};
use crate::properties::PropertySet;

/// 属性值的种类标签。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ValueKind {
    Bool,
    Int,
    Float,
    String,
    MultilineString,
    Color,
    Point,
    PointF,
    Rect,
    RectF,
    Size,
    FilePath,
    ClassRef,
    ObjectRef,
}

impl ValueKind {
    pub const ALL: [ValueKind; 14] = [
        ValueKind::Bool,
        ValueKind::Int,
        ValueKind::Float,
        ValueKind::String,
        ValueKind::MultilineString,
        ValueKind::Color,
        ValueKind::Point,
        ValueKind::PointF,
        ValueKind::Rect,
        ValueKind::RectF,
        ValueKind::Size,
        ValueKind::FilePath,
        ValueKind::ClassRef,
        ValueKind::ObjectRef,
    ];

    /// 脚本与日志中使用的名称。
    pub fn name(self) -> &'static str {
        match self {
            ValueKind::Bool => "bool",
            ValueKind::Int => "int",
            ValueKind::Float => "float",
            ValueKind::String => "string",
            ValueKind::MultilineString => "text",
            ValueKind::Color => "color",
            ValueKind::Point => "point",
            ValueKind::PointF => "pointf",
            ValueKind::Rect => "rect",
            ValueKind::RectF => "rectf",
            ValueKind::Size => "size",
            ValueKind::FilePath => "file",
            ValueKind::ClassRef => "class",
            ValueKind::ObjectRef => "object",
        }
    }

    #[inline]
    pub fn is_textual(self) -> bool {
        matches!(self, ValueKind::String | ValueKind::MultilineString)
    }

    #[inline]
    pub fn is_numeric(self) -> bool {
        matches!(self, ValueKind::Int | ValueKind::Float)
    }
}

impl fmt::Display for ValueKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for ValueKind {
    type Err = ConversionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        ValueKind::ALL
            .into_iter()
            .find(|kind| kind.name().eq_ignore_ascii_case(s))
            .ok_or_else(|| ConversionError::UnknownKind(s.to_string()))
    }
}

/// 复合值中的单个分量，用于只修改点或矩形的某一轴。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Component {
    X,
    Y,
    Width,
    Height,
}

/// 类类型的属性值：类名加上成员值。成员本身也是属性集，可以继续嵌套。
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ClassValue {
    pub class_name: String,
    pub members: PropertySet,
}

impl ClassValue {
    pub fn new(class_name: impl Into<String>, members: PropertySet) -> Self {
        Self {
            class_name: class_name.into(),
            members,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum PropertyValue {
    Bool(bool),
    Int(i64),
    Float(f64),
    String(String),
    MultilineString(String),
    Color(Color),
    Point(Point),
    PointF(PointF),
    Rect(Rect),
    RectF(RectF),
    Size(Size),
    FilePath(String),
    ClassRef(ClassValue),
    ObjectRef(EntityId),
}

impl PropertyValue {
    pub fn kind(&self) -> ValueKind {
        match self {
            PropertyValue::Bool(_) => ValueKind::Bool,
            PropertyValue::Int(_) => ValueKind::Int,
            PropertyValue::Float(_) => ValueKind::Float,
            PropertyValue::String(_) => ValueKind::String,
            PropertyValue::MultilineString(_) => ValueKind::MultilineString,
            PropertyValue::Color(_) => ValueKind::Color,
            PropertyValue::Point(_) => ValueKind::Point,
            PropertyValue::PointF(_) => ValueKind::PointF,
            PropertyValue::Rect(_) => ValueKind::Rect,
            PropertyValue::RectF(_) => ValueKind::RectF,
            PropertyValue::Size(_) => ValueKind::Size,
            PropertyValue::FilePath(_) => ValueKind::FilePath,
            PropertyValue::ClassRef(_) => ValueKind::ClassRef,
            PropertyValue::ObjectRef(_) => ValueKind::ObjectRef,
        }
    }

    /// 读取复合值的某个分量，整数分量会被提升为 `f64`。
    pub fn component(&self, component: Component) -> Option<f64> {
        match (self, component) {
            (PropertyValue::Point(p), Component::X) => Some(f64::from(p.x())),
            (PropertyValue::Point(p), Component::Y) => Some(f64::from(p.y())),
            (PropertyValue::PointF(p), Component::X) => Some(p.x()),
            (PropertyValue::PointF(p), Component::Y) => Some(p.y()),
            (PropertyValue::Size(s), Component::Width) => Some(f64::from(s.width)),
            (PropertyValue::Size(s), Component::Height) => Some(f64::from(s.height)),
            (PropertyValue::Rect(r), Component::X) => Some(f64::from(r.x)),
            (PropertyValue::Rect(r), Component::Y) => Some(f64::from(r.y)),
            (PropertyValue::Rect(r), Component::Width) => Some(f64::from(r.width)),
            (PropertyValue::Rect(r), Component::Height) => Some(f64::from(r.height)),
            (PropertyValue::RectF(r), Component::X) => Some(r.x()),
            (PropertyValue::RectF(r), Component::Y) => Some(r.y()),
            (PropertyValue::RectF(r), Component::Width) => Some(r.width()),
            (PropertyValue::RectF(r), Component::Height) => Some(r.height()),
            _ => None,
        }
    }

    /// 返回替换了单个分量后的新值；该种类没有此分量时返回 `None`。
    pub fn with_component(&self, component: Component, value: f64) -> Option<PropertyValue> {
        let int = || round_to_i32(value);
        let updated = match (self, component) {
            (PropertyValue::Point(p), Component::X) => PropertyValue::Point(Point::new(int(), p.y())),
            (PropertyValue::Point(p), Component::Y) => PropertyValue::Point(Point::new(p.x(), int())),
            (PropertyValue::PointF(p), Component::X) => PropertyValue::PointF(p.with_x(value)),
            (PropertyValue::PointF(p), Component::Y) => PropertyValue::PointF(p.with_y(value)),
            (PropertyValue::Size(s), Component::Width) => {
                PropertyValue::Size(Size::new(int(), s.height))
            }
            (PropertyValue::Size(s), Component::Height) => {
                PropertyValue::Size(Size::new(s.width, int()))
            }
            (PropertyValue::Rect(r), _) => {
                let mut rect = *r;
                match component {
                    Component::X => rect.x = int(),
                    Component::Y => rect.y = int(),
                    Component::Width => rect.width = int(),
                    Component::Height => rect.height = int(),
                }
                PropertyValue::Rect(rect)
            }
            (PropertyValue::RectF(r), _) => {
                let (mut x, mut y, mut w, mut h) = (r.x(), r.y(), r.width(), r.height());
                match component {
                    Component::X => x = value,
                    Component::Y => y = value,
                    Component::Width => w = value,
                    Component::Height => h = value,
                }
                PropertyValue::RectF(RectF::new(x, y, w, h))
            }
            _ => return None,
        };
        Some(updated)
    }

    /// 沿类成员路径取值，空路径返回自身。
    pub fn member(&self, path: &[String]) -> Option<&PropertyValue> {
        let Some((first, rest)) = path.split_first() else {
            return Some(self);
        };
        match self {
            PropertyValue::ClassRef(class) => class.members.get(first)?.member(rest),
            _ => None,
        }
    }

    /// 沿类成员路径写入。路径中间节点必须已经是类值，末端成员不存在时会被新增。
    pub fn with_member(&self, path: &[String], value: PropertyValue) -> Option<PropertyValue> {
        let Some((first, rest)) = path.split_first() else {
            return Some(value);
        };
        let PropertyValue::ClassRef(class) = self else {
            return None;
        };
        let mut class = class.clone();
        let updated = if rest.is_empty() {
            value
        } else {
            class.members.get(first)?.with_member(rest, value)?
        };
        class.members.insert(first.clone(), updated);
        Some(PropertyValue::ClassRef(class))
    }

    #[inline]
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            PropertyValue::Bool(value) => Some(*value),
            _ => None,
        }
    }

    #[inline]
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            PropertyValue::Float(value) => Some(*value),
            PropertyValue::Int(value) => Some(*value as f64),
            _ => None,
        }
    }

    #[inline]
    pub fn as_str(&self) -> Option<&str> {
        match self {
            PropertyValue::String(text)
            | PropertyValue::MultilineString(text)
            | PropertyValue::FilePath(text) => Some(text),
            _ => None,
        }
    }
}

impl fmt::Display for PropertyValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PropertyValue::ClassRef(class) => {
                write!(f, "{} {{", class.class_name)?;
                for (index, (name, value)) in class.members.iter().enumerate() {
                    if index > 0 {
                        f.write_str(",")?;
                    }
                    write!(f, " {name} = {value}")?;
                }
                f.write_str(" }")
            }
            other => match canonical_text(other) {
                Some(text) => f.write_str(&text),
                None => Ok(()),
            },
        }
    }
}

impl From<bool> for PropertyValue {
    fn from(value: bool) -> Self {
        PropertyValue::Bool(value)
    }
}

impl From<i64> for PropertyValue {
    fn from(value: i64) -> Self {
        PropertyValue::Int(value)
    }
}

impl From<f64> for PropertyValue {
    fn from(value: f64) -> Self {
        PropertyValue::Float(value)
    }
}

impl From<&str> for PropertyValue {
    fn from(value: &str) -> Self {
        PropertyValue::String(value.to_string())
    }
}

impl From<String> for PropertyValue {
    fn from(value: String) -> Self {
        PropertyValue::String(value)
    }
}

impl From<Color> for PropertyValue {
    fn from(value: Color) -> Self {
        PropertyValue::Color(value)
    }
}

impl From<PointF> for PropertyValue {
    fn from(value: PointF) -> Self {
        PropertyValue::PointF(value)
    }
}

#[derive(Debug, Clone, PartialEq, Error)]
pub enum ConversionError {
    #[error("cannot parse {text:?} as {target}")]
    Unparseable { text: String, target: ValueKind },
    #[error("conversion from {from} to {to} is not supported")]
    Unsupported { from: ValueKind, to: ValueKind },
    #[error("value {value} is out of range for {target}")]
    OutOfRange { value: String, target: ValueKind },
    #[error("unknown value kind {0:?}")]
    UnknownKind(String),
}

/// 将值转换为目标种类。
///
/// - 同种类转换总是成功；
/// - 标量与字符串之间可以互转，复合值使用规范文本（颜色 `#rrggbb`/`#aarrggbb`，
///   几何 `x,y` 与 `x,y,w,h`），无法解析时返回 [`ConversionError::Unparseable`]；
/// - 整数与浮点互转：扩宽总是成功，浮点转整数按四舍五入截断，属于有损转换；
/// - 布尔与整数以 0/1 互转。
pub fn convert(value: &PropertyValue, target: ValueKind) -> Result<PropertyValue, ConversionError> {
    let source = value.kind();
    if source == target {
        return Ok(value.clone());
    }

    if target.is_textual() {
        let text = canonical_text(value).ok_or(ConversionError::Unsupported {
            from: source,
            to: target,
        })?;
        return Ok(match target {
            ValueKind::MultilineString => PropertyValue::MultilineString(text),
            _ => PropertyValue::String(text),
        });
    }

    if let PropertyValue::String(text) | PropertyValue::MultilineString(text) = value {
        return parse_text(text, target);
    }

    let unsupported = ConversionError::Unsupported {
        from: source,
        to: target,
    };
    let converted = match (value, target) {
        (PropertyValue::Int(v), ValueKind::Float) => PropertyValue::Float(*v as f64),
        (PropertyValue::Float(v), ValueKind::Int) => PropertyValue::Int(float_to_int(*v)?),
        (PropertyValue::Bool(v), ValueKind::Int) => PropertyValue::Int(i64::from(*v)),
        (PropertyValue::Int(v), ValueKind::Bool) => PropertyValue::Bool(*v != 0),
        (PropertyValue::Int(v), ValueKind::ObjectRef) => {
            let id = u64::try_from(*v).map_err(|_| ConversionError::OutOfRange {
                value: v.to_string(),
                target,
            })?;
            PropertyValue::ObjectRef(EntityId::new(id))
        }
        (PropertyValue::ObjectRef(id), ValueKind::Int) => {
            let raw = i64::try_from(id.get()).map_err(|_| ConversionError::OutOfRange {
                value: id.get().to_string(),
                target,
            })?;
            PropertyValue::Int(raw)
        }
        (PropertyValue::Point(p), ValueKind::PointF) => PropertyValue::PointF(PointF::from(*p)),
        (PropertyValue::PointF(p), ValueKind::Point) => {
            PropertyValue::Point(Point::new(round_to_i32(p.x()), round_to_i32(p.y())))
        }
        (PropertyValue::Rect(r), ValueKind::RectF) => PropertyValue::RectF(RectF::from(*r)),
        (PropertyValue::RectF(r), ValueKind::Rect) => PropertyValue::Rect(Rect::new(
            round_to_i32(r.x()),
            round_to_i32(r.y()),
            round_to_i32(r.width()),
            round_to_i32(r.height()),
        )),
        _ => return Err(unsupported),
    };
    Ok(converted)
}

/// 标量与复合值的规范文本表示；类值没有文本形式。
fn canonical_text(value: &PropertyValue) -> Option<String> {
    let text = match value {
        PropertyValue::Bool(v) => v.to_string(),
        PropertyValue::Int(v) => v.to_string(),
        PropertyValue::Float(v) => v.to_string(),
        PropertyValue::String(v) | PropertyValue::MultilineString(v) | PropertyValue::FilePath(v) => {
            v.clone()
        }
        PropertyValue::Color(c) => c.to_hex(),
        PropertyValue::Point(p) => format!("{},{}", p.x(), p.y()),
        PropertyValue::PointF(p) => format!("{},{}", p.x(), p.y()),
        PropertyValue::Size(s) => format!("{},{}", s.width, s.height),
        PropertyValue::Rect(r) => format!("{},{},{},{}", r.x, r.y, r.width, r.height),
        PropertyValue::RectF(r) => format!("{},{},{},{}", r.x(), r.y(), r.width(), r.height()),
        PropertyValue::ObjectRef(id) => id.get().to_string(),
        PropertyValue::ClassRef(_) => return None,
    };
    Some(text)
}

fn parse_text(text: &str, target: ValueKind) -> Result<PropertyValue, ConversionError> {
    let unparseable = || ConversionError::Unparseable {
        text: text.to_string(),
        target,
    };
    let trimmed = text.trim();
    let parsed = match target {
        ValueKind::Bool => match trimmed.to_ascii_lowercase().as_str() {
            "true" | "1" => PropertyValue::Bool(true),
            "false" | "0" => PropertyValue::Bool(false),
            _ => return Err(unparseable()),
        },
        ValueKind::Int => PropertyValue::Int(trimmed.parse().map_err(|_| unparseable())?),
        ValueKind::Float => PropertyValue::Float(trimmed.parse().map_err(|_| unparseable())?),
        ValueKind::Color => PropertyValue::Color(Color::from_hex(trimmed).ok_or_else(unparseable)?),
        ValueKind::Point => {
            let [x, y] = components::<i32, 2>(trimmed).ok_or_else(unparseable)?;
            PropertyValue::Point(Point::new(x, y))
        }
        ValueKind::PointF => {
            let [x, y] = components::<f64, 2>(trimmed).ok_or_else(unparseable)?;
            PropertyValue::PointF(PointF::new(x, y))
        }
        ValueKind::Size => {
            let [w, h] = components::<i32, 2>(trimmed).ok_or_else(unparseable)?;
            PropertyValue::Size(Size::new(w, h))
        }
        ValueKind::Rect => {
            let [x, y, w, h] = components::<i32, 4>(trimmed).ok_or_else(unparseable)?;
            PropertyValue::Rect(Rect::new(x, y, w, h))
        }
        ValueKind::RectF => {
            let [x, y, w, h] = components::<f64, 4>(trimmed).ok_or_else(unparseable)?;
            PropertyValue::RectF(RectF::new(x, y, w, h))
        }
        ValueKind::FilePath => PropertyValue::FilePath(text.to_string()),
        ValueKind::ObjectRef => {
            PropertyValue::ObjectRef(EntityId::new(trimmed.parse().map_err(|_| unparseable())?))
        }
        ValueKind::String => PropertyValue::String(text.to_string()),
        ValueKind::MultilineString => PropertyValue::MultilineString(text.to_string()),
        ValueKind::ClassRef => {
            return Err(ConversionError::Unsupported {
                from: ValueKind::String,
                to: target,
            });
        }
    };
    Ok(parsed)
}

fn components<T: FromStr + Copy + Default, const N: usize>(text: &str) -> Option<[T; N]> {
    let mut out = [T::default(); N];
    let mut parts = text.split(',');
    for slot in out.iter_mut() {
        *slot = parts.next()?.trim().parse().ok()?;
    }
    if parts.next().is_some() {
        return None;
    }
    Some(out)
}

fn float_to_int(value: f64) -> Result<i64, ConversionError> {
    if !value.is_finite() {
        return Err(ConversionError::OutOfRange {
            value: value.to_string(),
            target: ValueKind::Int,
        });
    }
    // `as` 对超出范围的值做饱和处理
    Ok(value.round() as i64)
}

fn round_to_i32(value: f64) -> i32 {
    value.round() as i32
}

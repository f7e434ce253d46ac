pub mod entity;
pub mod graph;
pub mod properties;
pub mod resolver;
pub mod value;

pub mod geometry {
    use glam::{DVec2, IVec2};
    use serde::{Deserialize, Serialize};

    /// 整数二维点，用于图块坐标等离散位置。
    #[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
    pub struct Point(pub IVec2);

    impl Point {
        #[inline]
        pub fn new(x: i32, y: i32) -> Self {
            Self(IVec2::new(x, y))
        }

        #[inline]
        pub fn x(self) -> i32 {
            self.0.x
        }

        #[inline]
        pub fn y(self) -> i32 {
            self.0.y
        }

        #[inline]
        pub fn as_ivec2(self) -> IVec2 {
            self.0
        }
    }

    /// 双精度二维点，内部以 `glam::DVec2` 表示。偏移、视差系数、对象位置均使用该类型。
    #[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
    pub struct PointF(pub DVec2);

    impl PointF {
        #[inline]
        pub fn new(x: f64, y: f64) -> Self {
            Self(DVec2::new(x, y))
        }

        #[inline]
        pub fn x(self) -> f64 {
            self.0.x
        }

        #[inline]
        pub fn y(self) -> f64 {
            self.0.y
        }

        #[inline]
        pub fn with_x(self, x: f64) -> Self {
            Self(DVec2::new(x, self.0.y))
        }

        #[inline]
        pub fn with_y(self, y: f64) -> Self {
            Self(DVec2::new(self.0.x, y))
        }

        #[inline]
        pub fn as_vec2(self) -> DVec2 {
            self.0
        }
    }

    impl From<DVec2> for PointF {
        fn from(value: DVec2) -> Self {
            Self(value)
        }
    }

    impl From<Point> for PointF {
        fn from(value: Point) -> Self {
            Self(value.0.as_dvec2())
        }
    }

    /// 整数尺寸（宽、高）。
    #[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
    pub struct Size {
        pub width: i32,
        pub height: i32,
    }

    impl Size {
        #[inline]
        pub fn new(width: i32, height: i32) -> Self {
            Self { width, height }
        }

        #[inline]
        pub fn is_empty(&self) -> bool {
            self.width <= 0 || self.height <= 0
        }
    }

    /// 整数矩形，以左上角与尺寸描述。
    #[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
    pub struct Rect {
        pub x: i32,
        pub y: i32,
        pub width: i32,
        pub height: i32,
    }

    impl Rect {
        #[inline]
        pub fn new(x: i32, y: i32, width: i32, height: i32) -> Self {
            Self {
                x,
                y,
                width,
                height,
            }
        }

        #[inline]
        pub fn origin(&self) -> Point {
            Point::new(self.x, self.y)
        }

        #[inline]
        pub fn size(&self) -> Size {
            Size::new(self.width, self.height)
        }
    }

    /// 双精度矩形，描述对象的几何范围。
    #[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
    pub struct RectF {
        origin: DVec2,
        size: DVec2,
    }

    impl RectF {
        #[inline]
        pub fn new(x: f64, y: f64, width: f64, height: f64) -> Self {
            Self {
                origin: DVec2::new(x, y),
                size: DVec2::new(width, height),
            }
        }

        #[inline]
        pub fn x(&self) -> f64 {
            self.origin.x
        }

        #[inline]
        pub fn y(&self) -> f64 {
            self.origin.y
        }

        #[inline]
        pub fn width(&self) -> f64 {
            self.size.x
        }

        #[inline]
        pub fn height(&self) -> f64 {
            self.size.y
        }

        #[inline]
        pub fn origin(&self) -> PointF {
            PointF(self.origin)
        }

        /// 平移到新的原点，尺寸保持不变。
        #[inline]
        pub fn with_origin(self, origin: PointF) -> Self {
            Self {
                origin: origin.as_vec2(),
                size: self.size,
            }
        }

        #[inline]
        pub fn center(&self) -> PointF {
            PointF(self.origin + self.size * 0.5)
        }
    }

    impl From<Rect> for RectF {
        fn from(value: Rect) -> Self {
            Self::new(
                f64::from(value.x),
                f64::from(value.y),
                f64::from(value.width),
                f64::from(value.height),
            )
        }
    }

    /// 8 位 RGBA 颜色。
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
    pub struct Color {
        pub r: u8,
        pub g: u8,
        pub b: u8,
        pub a: u8,
    }

    impl Color {
        pub const WHITE: Color = Color::rgb(255, 255, 255);
        pub const BLACK: Color = Color::rgb(0, 0, 0);

        #[inline]
        pub const fn rgb(r: u8, g: u8, b: u8) -> Self {
            Self { r, g, b, a: 255 }
        }

        #[inline]
        pub const fn rgba(r: u8, g: u8, b: u8, a: u8) -> Self {
            Self { r, g, b, a }
        }

        #[inline]
        pub fn is_opaque(&self) -> bool {
            self.a == 255
        }

        /// 不透明颜色输出 `#rrggbb`，否则输出 `#aarrggbb`。
        pub fn to_hex(&self) -> String {
            if self.is_opaque() {
                format!("#{:02x}{:02x}{:02x}", self.r, self.g, self.b)
            } else {
                format!("#{:02x}{:02x}{:02x}{:02x}", self.a, self.r, self.g, self.b)
            }
        }

        /// 解析 `#rrggbb` 或 `#aarrggbb`（大小写不敏感）。
        pub fn from_hex(text: &str) -> Option<Self> {
            let digits = text.strip_prefix('#')?;
            if !digits.bytes().all(|b| b.is_ascii_hexdigit()) {
                return None;
            }
            let byte = |index: usize| u8::from_str_radix(&digits[index..index + 2], 16).ok();
            match digits.len() {
                6 => Some(Self::rgb(byte(0)?, byte(2)?, byte(4)?)),
                8 => Some(Self::rgba(byte(2)?, byte(4)?, byte(6)?, byte(0)?)),
                _ => None,
            }
        }
    }

    impl Default for Color {
        fn default() -> Self {
            Self::BLACK
        }
    }

    #[cfg(test)]
    mod tests {
        use super::*;

        #[test]
        fn color_hex_round_trips() {
            let opaque = Color::rgb(0x12, 0xab, 0xff);
            assert_eq!(opaque.to_hex(), "#12abff");
            assert_eq!(Color::from_hex("#12ABFF"), Some(opaque));

            let translucent = Color::rgba(1, 2, 3, 0x80);
            assert_eq!(translucent.to_hex(), "#80010203");
            assert_eq!(Color::from_hex(&translucent.to_hex()), Some(translucent));
        }

        #[test]
        fn malformed_hex_is_rejected() {
            assert_eq!(Color::from_hex("12abff"), None);
            assert_eq!(Color::from_hex("#12ab"), None);
            assert_eq!(Color::from_hex("#zzzzzz"), None);
            assert_eq!(Color::from_hex("#ééé"), None);
            assert_eq!(Color::from_hex("#+1+2+3"), None);
            assert_eq!(Color::from_hex("#+f+f+f+f"), None);
        }

        #[test]
        fn rect_origin_moves_without_resizing() {
            let rect = RectF::new(1.0, 2.0, 10.0, 20.0);
            let moved = rect.with_origin(PointF::new(5.0, 6.0));
            assert_eq!(moved.x(), 5.0);
            assert_eq!(moved.y(), 6.0);
            assert_eq!(moved.width(), 10.0);
            assert_eq!(moved.height(), 20.0);
            assert_eq!(moved.center(), PointF::new(10.0, 16.0));
        }
    }
}

//! 命令行输入解析
//!
//! 支持的输入格式：
//! - 绝对坐标: `100,50`
//! - 相对坐标: `@100,50`
//! - 极坐标: `@100<45` (相对) 或 `100<45` (长度+角度)
//! - 数值: `100`
//! - 角度: `<45`
//!
//! [`InputParser::command_input`] 把一行文本转换成命令输入：
//! 空行是回车，无法解析为数值的单词是命令选项。

use crate::command::CommandInput;
use thiserror::Error;
use zdraft_core::math::Point2;

/// 解析后的输入值
#[derive(Debug, Clone, PartialEq)]
pub enum InputValue {
    Point(Point2<f64>),
    /// 长度或比例
    Length(f64),
    /// 角度（弧度）
    Angle(f64),
    /// 长度和角度（弧度）
    LengthAngle { length: f64, angle: f64 },
}

/// 解析错误
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ParseError {
    #[error("Invalid format: {0}")]
    InvalidFormat(String),

    #[error("Missing value: {0}")]
    MissingValue(String),
}

/// 输入解析器
pub struct InputParser;

impl InputParser {
    /// 解析输入字符串
    ///
    /// `reference_point` 用于相对坐标和相对极坐标。
    pub fn parse(
        input: &str,
        reference_point: Option<Point2<f64>>,
    ) -> Result<InputValue, ParseError> {
        let input = input.trim();
        if input.is_empty() {
            return Err(ParseError::InvalidFormat("Empty input".to_string()));
        }

        // 长度+角度格式 (如 "100<45" 或 "@100<45")
        if let Some((prefix, angle_str)) = input.rsplit_once('<') {
            let angle = parse_number(angle_str, "angle")?.to_radians();

            let (is_relative, length_str) = match prefix.strip_prefix('@') {
                Some(rest) => (true, rest),
                None => (false, prefix),
            };
            if length_str.is_empty() {
                return Ok(InputValue::Angle(angle));
            }
            let length = parse_number(length_str, "length")?;

            if !is_relative {
                return Ok(InputValue::LengthAngle { length, angle });
            }
            let origin = reference_point.ok_or_else(|| {
                ParseError::MissingValue(
                    "Reference point required for relative polar coordinate".to_string(),
                )
            })?;
            return Ok(InputValue::Point(polar_to_point(origin, length, angle)));
        }

        // 坐标格式 (如 "100,50" 或 "@100,50")
        if let Some((x_str, y_str)) = input.split_once(',') {
            let (is_relative, x_str) = match x_str.trim().strip_prefix('@') {
                Some(rest) => (true, rest),
                None => (false, x_str),
            };
            let x = parse_number(x_str, "X coordinate")?;
            let y = parse_number(y_str, "Y coordinate")?;

            if !is_relative {
                return Ok(InputValue::Point(Point2::new(x, y)));
            }
            let origin = reference_point.ok_or_else(|| {
                ParseError::MissingValue("Reference point required for relative coordinate".to_string())
            })?;
            return Ok(InputValue::Point(Point2::new(origin.x + x, origin.y + y)));
        }

        match input.parse::<f64>() {
            Ok(value) if value.is_finite() => Ok(InputValue::Length(value)),
            _ => Err(ParseError::InvalidFormat(format!("Cannot parse input: {input}"))),
        }
    }

    /// 解析为点坐标
    ///
    /// 长度+角度基于参考点计算。
    pub fn parse_point(
        input: &str,
        reference_point: Option<Point2<f64>>,
    ) -> Result<Point2<f64>, ParseError> {
        match Self::parse(input, reference_point)? {
            InputValue::Point(p) => Ok(p),
            InputValue::LengthAngle { length, angle } => reference_point
                .map(|origin| polar_to_point(origin, length, angle))
                .ok_or_else(|| {
                    ParseError::MissingValue(
                        "Reference point required for length+angle input".to_string(),
                    )
                }),
            _ => Err(ParseError::InvalidFormat(
                "Input cannot be converted to point".to_string(),
            )),
        }
    }

    /// 把一行命令行文本转换为命令输入
    ///
    /// - 空行 → `Enter`
    /// - 点坐标、极坐标 → `Point`
    /// - 数值 → `Value`；`<角度` → 以度为单位的 `Value`
    /// - 以字母开头的单词 → `Option`
    pub fn command_input(
        input: &str,
        reference_point: Option<Point2<f64>>,
    ) -> Result<CommandInput, ParseError> {
        let text = input.trim();
        if text.is_empty() {
            return Ok(CommandInput::Enter);
        }
        if text.starts_with(|c: char| c.is_alphabetic()) {
            return Ok(CommandInput::Option(text.to_string()));
        }

        match Self::parse(text, reference_point)? {
            InputValue::Point(p) => Ok(CommandInput::Point(p)),
            InputValue::Length(v) => Ok(CommandInput::Value(v)),
            InputValue::Angle(a) => Ok(CommandInput::Value(a.to_degrees())),
            InputValue::LengthAngle { .. } => {
                Self::parse_point(text, reference_point).map(CommandInput::Point)
            }
        }
    }
}

fn parse_number(text: &str, what: &str) -> Result<f64, ParseError> {
    let text = text.trim();
    text.parse::<f64>()
        .ok()
        .filter(|v| v.is_finite())
        .ok_or_else(|| ParseError::InvalidFormat(format!("Invalid {what}: {text}")))
}

/// 极坐标转换为点
fn polar_to_point(origin: Point2<f64>, distance: f64, angle: f64) -> Point2<f64> {
    Point2::new(
        origin.x + distance * angle.cos(),
        origin.y + distance * angle.sin(),
    )
}

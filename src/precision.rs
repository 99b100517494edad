use rust_decimal::prelude::*;
use serde_json::Value;

use crate::error::PrecisionError;

/// 永续合约价格允许的最大小数位数（实际上限为 MAX_PERP_DECIMALS - szDecimals）
pub const MAX_PERP_DECIMALS: u32 = 6;

/// 非整数价格允许的最大有效数字位数
pub const MAX_SIGNIFICANT_FIGURES: u32 = 5;

/// 将 JSON 数字或字符串解析为精确的十进制数
///
/// serde_json 开启了 `arbitrary_precision`，JSON 数字保留原始文本，不经过 f64。
/// 超出 Decimal 精度（28 位有效数字）的值直接报错，不做舍入。
///
/// # 示例
/// ```ignore
/// let d = parse_decimal(&json!("50000.12"))?;
/// assert_eq!(d, Decimal::from_str("50000.12")?);
/// ```
pub fn parse_decimal(value: &Value) -> Result<Decimal, PrecisionError> {
    let text = match value {
        Value::Number(n) => n.to_string(),
        Value::String(s) => s.trim().to_string(),
        other => return Err(PrecisionError::Unparseable(other.to_string())),
    };

    let parsed = if text.contains(['e', 'E']) {
        Decimal::from_scientific(&text)
    } else {
        Decimal::from_str_exact(&text)
    };

    parsed.map_err(|e| PrecisionError::Unparseable(format!("{}: {}", text, e)))
}

fn require_positive(field: &'static str, value: Decimal) -> Result<(), PrecisionError> {
    if value <= Decimal::ZERO {
        return Err(PrecisionError::NotPositive { field });
    }
    Ok(())
}

fn significant_figures(value: Decimal) -> u32 {
    let digits = value.normalize().mantissa().unsigned_abs().to_string();
    digits.trim_end_matches('0').len().max(1) as u32
}

/// 校验下单数量是否符合该资产的最小数量单位（lot size）
pub fn check_size(size: Decimal, sz_decimals: u32) -> Result<(), PrecisionError> {
    require_positive("size", size)?;

    if size.normalize().scale() > sz_decimals {
        return Err(PrecisionError::TooManyDecimals {
            field: "size",
            value: size.normalize().to_string(),
            max: sz_decimals,
        });
    }
    Ok(())
}

/// 校验限价是否符合交易所的价格精度（tick size）规则
///
/// 整数价格总是合法；否则最多 5 位有效数字，且小数位不超过 6 - szDecimals。
pub fn check_price(price: Decimal, sz_decimals: u32) -> Result<(), PrecisionError> {
    require_positive("price", price)?;

    let normalized = price.normalize();
    if normalized.fract().is_zero() {
        return Ok(());
    }

    let max_decimals = MAX_PERP_DECIMALS.saturating_sub(sz_decimals);
    if normalized.scale() > max_decimals {
        return Err(PrecisionError::TooManyDecimals {
            field: "price",
            value: normalized.to_string(),
            max: max_decimals,
        });
    }

    if significant_figures(normalized) > MAX_SIGNIFICANT_FIGURES {
        return Err(PrecisionError::TooManySignificantFigures {
            field: "price",
            value: normalized.to_string(),
            max: MAX_SIGNIFICANT_FIGURES,
        });
    }
    Ok(())
}

/// 计算市价单的保护价格（IOC 限价单）
///
/// 买单取 mid * (1 + slippage)，卖单取 mid * (1 - slippage)，
/// 再按交易所规则取 5 位有效数字并截断到允许的小数位。
pub fn market_price(
    mid: Decimal,
    is_buy: bool,
    slippage: Decimal,
    sz_decimals: u32,
) -> Result<Decimal, PrecisionError> {
    require_positive("mid price", mid)?;
    if slippage < Decimal::ZERO || slippage >= Decimal::ONE {
        return Err(PrecisionError::Unparseable(format!(
            "slippage must be in [0, 1), got {}",
            slippage
        )));
    }

    let factor = if is_buy {
        Decimal::ONE + slippage
    } else {
        Decimal::ONE - slippage
    };

    let raw = mid.checked_mul(factor).ok_or(PrecisionError::Overflow)?;
    let rounded = raw
        .round_sf(MAX_SIGNIFICANT_FIGURES)
        .ok_or(PrecisionError::Overflow)?;

    Ok(rounded
        .round_dp(MAX_PERP_DECIMALS.saturating_sub(sz_decimals))
        .normalize())
}

/// 交易所线上格式：去掉多余的零，例如 50000.10 -> "50000.1"
pub fn to_wire(value: Decimal) -> String {
    value.normalize().to_string()
}

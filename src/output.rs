//! Line-oriented output for the non-interactive subcommands.
//!
//! TSV by default, one JSON object per line with `--json`.

use std::fmt::Write as _;
use std::io::Write;

use gecko::Instrument;
use serde::Serialize;

use crate::chart::ChartView;
use crate::error::AppError;
use crate::format::{
    format_magnitude, format_optional, format_percent, format_price, NOT_AVAILABLE,
};

/// Machine-readable ticker row.
#[derive(Serialize)]
struct TickerRow<'a> {
    tick: u64,
    id: &'a str,
    symbol: &'a str,
    price: f64,
    change_24h: Option<f64>,
    change_pct_24h: Option<f64>,
}

#[derive(Serialize)]
struct ChartDoc<'a> {
    id: &'a str,
    live_price: f64,
    change_24h: Option<f64>,
    change_pct_24h: Option<f64>,
    points: &'a [crate::chart::ChartPoint],
}

/// One ticker entry: `BTC  $67,123.40  +1.23%`.
pub fn ticker_line(inst: &Instrument) -> String {
    format!(
        "{}  {}  {}",
        inst.symbol.to_uppercase(),
        format_price(inst.current_price),
        format_percent(inst.price_change_percentage_24h),
    )
}

/// Write every instrument of one applied tick.
///
/// TSV columns: tick, symbol, price, 24h change, 24h change %.
pub fn write_ticker<W: Write>(
    writer: &mut W,
    tick: u64,
    instruments: &[Instrument],
    json: bool,
    buf: &mut String,
) -> Result<(), AppError> {
    buf.clear();
    for inst in instruments {
        if json {
            let row = TickerRow {
                tick,
                id: &inst.id,
                symbol: &inst.symbol,
                price: inst.current_price,
                change_24h: inst.price_change_24h,
                change_pct_24h: inst.price_change_percentage_24h,
            };
            buf.push_str(&serde_json::to_string(&row)?);
        } else {
            let _ = write!(
                buf,
                "{tick}\t{}\t{}\t{}\t{}",
                inst.symbol.to_uppercase(),
                format_price(inst.current_price),
                inst.price_change_24h.map_or_else(|| NOT_AVAILABLE.to_string(), format_price),
                format_percent(inst.price_change_percentage_24h),
            );
        }
        buf.push('\n');
    }
    writer.write_all(buf.as_bytes())?;
    writer.flush()?;
    Ok(())
}

/// Instrument table with a header row.
pub fn write_table<W: Write>(
    writer: &mut W,
    instruments: &[Instrument],
    json: bool,
) -> Result<(), AppError> {
    if json {
        serde_json::to_writer(&mut *writer, instruments)?;
        writer.write_all(b"\n")?;
        writer.flush()?;
        return Ok(());
    }

    let mut buf = String::with_capacity(64 * (instruments.len() + 1));
    buf.push_str("rank\tsymbol\tname\tprice\t24h\tmarket_cap\tvolume\tcirculating\n");
    for inst in instruments {
        let rank = inst
            .market_cap_rank
            .map_or_else(|| "-".to_string(), |r| r.to_string());
        let _ = writeln!(
            buf,
            "{rank}\t{}\t{}\t{}\t{}\t{}\t{}\t{}",
            inst.symbol.to_uppercase(),
            inst.name,
            format_price(inst.current_price),
            format_percent(inst.price_change_percentage_24h),
            format_optional(inst.market_cap),
            format_optional(inst.total_volume),
            format_optional(inst.circulating_supply),
        );
    }
    writer.write_all(buf.as_bytes())?;
    writer.flush()?;
    Ok(())
}

/// Chart summary plus its last `points` samples.
pub fn write_chart<W: Write>(
    writer: &mut W,
    id: &str,
    view: &ChartView,
    points: usize,
    json: bool,
) -> Result<(), AppError> {
    let tail = view.tail(points);
    let (abs, pct) = match view.change {
        Some(c) => (Some(c.absolute), c.percent),
        None => (None, None),
    };

    if json {
        let doc = ChartDoc {
            id,
            live_price: view.live_price,
            change_24h: abs,
            change_pct_24h: pct,
            points: tail,
        };
        serde_json::to_writer(&mut *writer, &doc)?;
        writer.write_all(b"\n")?;
        writer.flush()?;
        return Ok(());
    }

    let mut buf = String::with_capacity(48 * (tail.len() + 2));
    let _ = writeln!(
        buf,
        "# {id}\tlive {}\t24h {}",
        format_price(view.live_price),
        format_percent(pct),
    );
    for p in tail {
        let _ = writeln!(
            buf,
            "{}\t{:.2}\t{}\t{}",
            p.time,
            p.price,
            format_magnitude(p.market_cap),
            format_magnitude(p.volume),
        );
    }
    writer.write_all(buf.as_bytes())?;
    writer.flush()?;
    Ok(())
}

//! Crypto derivatives aggregation: global open interest, liquidations and funding grids.

use std::collections::{BTreeMap, HashMap};

use chrono::NaiveDate;

use crate::data::{FundingHeatmap, FundingObservation, GlobalOi, LiquidationPoint, Sample};

/// Split aggregate open interest into BTC, ETH and everything else.
///
/// Dates come from the BTC series, in first-seen order. ETH and total values
/// attach by date and read as zero when absent.
pub fn global_open_interest(btc: &[Sample], eth: &[Sample], total: &[Sample]) -> Vec<GlobalOi> {
    let mut order: Vec<NaiveDate> = Vec::with_capacity(btc.len());
    let mut rows: HashMap<NaiveDate, GlobalOi> = HashMap::with_capacity(btc.len());

    for s in btc {
        let row = rows.entry(s.date).or_insert_with(|| {
            order.push(s.date);
            GlobalOi {
                date: s.date,
                global: 0.0,
                btc: 0.0,
                eth: 0.0,
                others: 0.0,
            }
        });
        row.btc = s.value;
    }
    for s in eth {
        if let Some(row) = rows.get_mut(&s.date) {
            row.eth = s.value;
        }
    }
    for s in total {
        if let Some(row) = rows.get_mut(&s.date) {
            row.global = s.value;
        }
    }

    order
        .into_iter()
        .filter_map(|date| rows.remove(&date))
        .map(|row| GlobalOi {
            others: row.global - row.btc - row.eth,
            ..row
        })
        .collect()
}

/// Sum liquidations that fall on the same day, oldest day first.
pub fn daily_liquidations(points: &[LiquidationPoint]) -> Vec<LiquidationPoint> {
    let mut days: BTreeMap<NaiveDate, (f64, f64)> = BTreeMap::new();
    for p in points {
        let day = days.entry(p.date).or_insert((0.0, 0.0));
        day.0 += p.long;
        day.1 += p.short;
    }
    days.into_iter()
        .map(|(date, (long, short))| LiquidationPoint::new(date, long, short))
        .collect()
}

/// Strip the `USDT` quote suffix from an exchange symbol.
pub fn base_symbol(symbol: &str) -> &str {
    symbol.strip_suffix("USDT").unwrap_or(symbol)
}

/// Pivot funding prints into a date x symbol grid of percentages.
///
/// Rows follow first-seen date order, columns follow `symbols`. A later print
/// for the same date and symbol replaces an earlier one; missing cells are 0.
pub fn funding_heatmap(observations: &[FundingObservation], symbols: &[String]) -> FundingHeatmap {
    let mut dates: Vec<NaiveDate> = Vec::new();
    let mut by_date: HashMap<NaiveDate, HashMap<&str, f64>> = HashMap::new();

    for obs in observations {
        by_date
            .entry(obs.date)
            .or_insert_with(|| {
                dates.push(obs.date);
                HashMap::new()
            })
            .insert(base_symbol(&obs.symbol), obs.rate * 100.0);
    }

    let data = dates
        .iter()
        .map(|date| {
            let row = &by_date[date];
            symbols
                .iter()
                .map(|s| row.get(s.as_str()).copied().unwrap_or(0.0))
                .collect()
        })
        .collect();

    FundingHeatmap {
        dates,
        symbols: symbols.to_vec(),
        data,
    }
}

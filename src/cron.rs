//! Cron schedule shape: field names, persisted-format conversion and
//! expression syntax checks.

use serde_json::{Map, Value};

/// Schedule fields in expression order.
pub const CRON_FIELDS: [&str; 5] = ["minute", "hour", "dom", "month", "dow"];

/// Flattened column names used by the persisted representation.
pub const DB_FIELDS: [&str; 5] = ["minute", "hour", "daymonth", "month", "dayweek"];

const MONTH_NAMES: [&str; 12] = [
    "jan", "feb", "mar", "apr", "may", "jun", "jul", "aug", "sep", "oct", "nov", "dec",
];
const DOW_NAMES: [&str; 7] = ["sun", "mon", "tue", "wed", "thu", "fri", "sat"];

/// Move `data[schedule_name]` into the flattened persisted keys.
///
/// Nothing happens when the schedule is absent or empty.
pub fn convert_schedule_to_db_format(data: &mut Map<String, Value>, schedule_name: &str) {
    let Some(schedule) = data.remove(schedule_name) else {
        return;
    };
    let Value::Object(schedule) = schedule else {
        return;
    };
    for (field, db_field) in CRON_FIELDS.iter().zip(DB_FIELDS) {
        if let Some(v) = schedule.get(*field) {
            data.insert(db_field.to_string(), v.clone());
        }
    }
}

/// Inverse of [`convert_schedule_to_db_format`]: gather the persisted keys
/// into a nested schedule object under `schedule_name`.
pub fn convert_db_format_to_schedule(data: &mut Map<String, Value>, schedule_name: &str) {
    let mut schedule = Map::new();
    for (field, db_field) in CRON_FIELDS.iter().zip(DB_FIELDS) {
        if let Some(v) = data.remove(db_field) {
            schedule.insert(field.to_string(), v);
        }
    }
    data.insert(schedule_name.to_string(), Value::Object(schedule));
}

/// Assemble the five-field expression; missing or empty fields become `*`.
pub fn cron_expression(schedule: &Map<String, Value>) -> String {
    CRON_FIELDS
        .iter()
        .map(|field| match schedule.get(*field) {
            Some(Value::String(s)) if !s.is_empty() => s.as_str(),
            _ => "*",
        })
        .collect::<Vec<_>>()
        .join(" ")
}

/// Check an expression is syntactically well-formed.
pub fn check_expression(expression: &str) -> Result<(), String> {
    let parts: Vec<&str> = expression.split_whitespace().collect();
    if parts.len() != CRON_FIELDS.len() {
        return Err(format!(
            "Exactly {} columns has to be specified for iterator expression.",
            CRON_FIELDS.len()
        ));
    }
    for (index, part) in parts.iter().enumerate() {
        FieldSpec::for_index(index).check(part)?;
    }
    Ok(())
}

struct FieldSpec {
    name: &'static str,
    min: u32,
    max: u32,
    names: &'static [&'static str],
    /// Numeric value of `names[0]`.
    names_base: u32,
}

impl FieldSpec {
    fn for_index(index: usize) -> Self {
        match index {
            0 => Self::numeric("minute", 0, 59),
            1 => Self::numeric("hour", 0, 23),
            2 => Self::numeric("dom", 1, 31),
            3 => Self {
                name: "month",
                min: 1,
                max: 12,
                names: &MONTH_NAMES,
                names_base: 1,
            },
            _ => Self {
                name: "dow",
                min: 0,
                max: 7,
                names: &DOW_NAMES,
                names_base: 0,
            },
        }
    }

    fn numeric(name: &'static str, min: u32, max: u32) -> Self {
        Self {
            name,
            min,
            max,
            names: &[],
            names_base: 0,
        }
    }

    fn check(&self, field: &str) -> Result<(), String> {
        for item in field.split(',') {
            self.check_item(item)
                .map_err(|detail| format!("[{}] is not acceptable: {}", field, detail))?;
        }
        Ok(())
    }

    fn check_item(&self, item: &str) -> Result<(), String> {
        if item.is_empty() {
            return Err("empty list item".to_string());
        }

        let (range, step) = match item.split_once('/') {
            Some((r, s)) => (r, Some(s)),
            None => (item, None),
        };
        if let Some(step) = step {
            match step.parse::<u32>() {
                Ok(n) if n > 0 => {}
                _ => return Err(format!("invalid step \"{}\"", step)),
            }
        }

        if range == "*" {
            return Ok(());
        }
        if self.name == "dom" && range.eq_ignore_ascii_case("l") && step.is_none() {
            return Ok(());
        }
        if self.name == "dow" && step.is_none() {
            if let Some((day, nth)) = range.split_once('#') {
                self.value(day)?;
                return match nth.parse::<u32>() {
                    Ok(n) if (1..=5).contains(&n) => Ok(()),
                    _ => Err(format!("invalid nth weekday \"{}\"", nth)),
                };
            }
        }

        match range.split_once('-') {
            Some((low, high)) => {
                let low = self.value(low)?;
                let high = self.value(high)?;
                if low > high {
                    return Err(format!("range {}-{} is reversed", low, high));
                }
                Ok(())
            }
            None => self.value(range).map(|_| ()),
        }
    }

    fn value(&self, text: &str) -> Result<u32, String> {
        let lower = text.to_ascii_lowercase();
        if let Some(pos) = self.names.iter().position(|n| *n == lower) {
            return Ok(self.names_base + pos as u32);
        }
        let n: u32 = text
            .parse()
            .map_err(|_| format!("\"{}\" is not a valid {} value", text, self.name))?;
        if n < self.min || n > self.max {
            return Err(format!(
                "{} is out of range for {} ({}-{})",
                n, self.name, self.min, self.max
            ));
        }
        Ok(n)
    }
}

/*
Copyright 2021 Jakub Lewandowski

This file is part of METplus Data Staging (metstage).

METplus Data Staging (metstage) is a free software: you can redistribute it and/or modify
it under the terms of the GNU General Public License as published by
the Free Software Foundation; either version 3 of the License, or
(at your option) any later version.

METplus Data Staging (metstage) is distributed in the hope that it will be useful,
but WITHOUT ANY WARRANTY; without even the implied warranty of
MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE. See the
GNU General Public License for more details.

You should have received a copy of the GNU General Public License
along with METplus Data Staging (metstage). If not, see https://www.gnu.org/licenses/.
*/

//! Filling of file naming templates.
//!
//! A template is a path whose segments may contain placeholders
//! `{field?fmt=SPEC}` where `field` is one of `lead`, `valid`, `init`
//! or `cycle`. For time fields `SPEC` is a `strftime` pattern (`cycle`
//! uses the init time). For `lead` the spec is one of:
//!
//! - `%1H`: leads below 10 hours as a single digit, others unchanged
//! - `%2H`: lead padded with zeros to two digits
//! - `%3H`: lead padded with zeros to three digits
//!
//! and any other spec leaves the lead label unchanged.

use super::timegrid::{Lead, TimeSlot};
use crate::errors::TemplateError;
use chrono::format::{Item, StrftimeItems};
use chrono::NaiveDateTime;

#[derive(Copy, Clone, Debug)]
enum Field {
    Lead,
    Valid,
    Init,
    Cycle,
}

impl Field {
    const ALL: [Field; 4] = [Field::Lead, Field::Valid, Field::Init, Field::Cycle];

    fn name(self) -> &'static str {
        match self {
            Field::Lead => "lead",
            Field::Valid => "valid",
            Field::Init => "init",
            Field::Cycle => "cycle",
        }
    }
}

/// Resolves all placeholders of the template for given times and lead.
pub fn resolve(
    template: &str,
    valid: &NaiveDateTime,
    init: &NaiveDateTime,
    lead: &Lead,
) -> Result<String, TemplateError> {
    let segments = template
        .split('/')
        .map(|segment| resolve_segment(template, segment, valid, init, lead))
        .collect::<Result<Vec<_>, _>>()?;

    Ok(segments.join("/"))
}

pub fn resolve_slot(template: &str, slot: &TimeSlot) -> Result<String, TemplateError> {
    resolve(template, &slot.valid, &slot.init, &slot.lead)
}

fn resolve_segment(
    template: &str,
    segment: &str,
    valid: &NaiveDateTime,
    init: &NaiveDateTime,
    lead: &Lead,
) -> Result<String, TemplateError> {
    let mut filled = segment.to_string();

    for field in Field::ALL {
        let opening = format!("{{{}?fmt=", field.name());
        let occurrences = filled.matches(&opening).count();

        // each pass consumes at least the first occurrence,
        // identical placeholders are replaced all at once
        for _ in 0..occurrences {
            let start = match filled.find(&opening) {
                Some(position) => position + opening.len(),
                None => break,
            };

            let spec = match filled[start..].find('}') {
                Some(length) => filled[start..start + length].to_string(),
                None => {
                    return Err(TemplateError::InvalidFormat(
                        template.to_string(),
                        filled[start..].to_string(),
                    ))
                }
            };

            let value = match field {
                Field::Lead => format_lead(lead, &spec),
                Field::Valid => format_time(template, valid, &spec)?,
                Field::Init | Field::Cycle => format_time(template, init, &spec)?,
            };

            let placeholder = format!("{}{}}}", opening, spec);
            filled = filled.replace(&placeholder, &value);
        }
    }

    Ok(filled)
}

fn format_lead(lead: &Lead, spec: &str) -> String {
    match spec {
        "%1H" if lead.hours < 10 => lead.hours.to_string(),
        "%2H" => lead.padded(2),
        "%3H" => lead.padded(3),
        _ => lead.label.clone(),
    }
}

fn format_time(template: &str, time: &NaiveDateTime, spec: &str) -> Result<String, TemplateError> {
    let items = StrftimeItems::new(spec);

    if spec.is_empty() || items.clone().any(|item| item == Item::Error) {
        return Err(TemplateError::InvalidFormat(
            template.to_string(),
            spec.to_string(),
        ));
    }

    Ok(time.format_with_items(items).to_string())
}

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

//! Grid-to-grid verification: forecasts of every model and the
//! analyses they are verified against.

use super::{analysis_format, stage_analysis, stage_forecasts, stage_surface_f00, AnalysisRequest, Context};
use crate::errors::StagerError;
use crate::stager::configuration::Config;
use crate::stager::timegrid::{generate, unique_valid_times};
use log::info;

pub fn run(ctx: &Context) -> Result<(), StagerError> {
    let config = ctx.config;
    let section = Config::section(&config.grid2grid_step1, "grid2grid_step1")?;

    let window = ctx.window(&section.hours)?;
    let slots = generate(&window, &section.fhr_list, config.make_met_data_by);
    let valid_times = unique_valid_times(&slots);
    let surface = section.type_list.iter().any(|kind| kind == "sfc");

    for (index, model) in config.models.iter().enumerate() {
        stage_forecasts(ctx, model, &model.file_format, &slots)?;

        let request = AnalysisRequest {
            source: section.anl_name,
            format: analysis_format(&section.anl_file_format_list, section.anl_name, index, model)?,
            f00_fallback: true,
        };

        info!("Getting {} analysis files", model.name);
        for valid in &valid_times {
            stage_analysis(ctx, model, &request, valid)?;

            if surface {
                stage_surface_f00(ctx, model, valid)?;
            }
        }
    }

    Ok(())
}

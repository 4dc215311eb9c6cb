use crate::error::Result;
use crate::models::test::Test;
use crate::models::test_attempt::TestAttempt;
use crate::services::scoring_service::AttemptResults;
use rust_xlsxwriter::*;
use std::collections::BTreeSet;

pub struct ExportService;

const FIXED_COLUMNS: [(&str, f64); 7] = [
    ("#", 6.0),
    ("Candidate", 28.0),
    ("Email", 30.0),
    ("Status", 14.0),
    ("Total score", 12.0),
    ("Percentage", 12.0),
    ("Completed at", 20.0),
];

fn parsed_results(attempt: &TestAttempt) -> Option<AttemptResults> {
    attempt
        .results
        .clone()
        .and_then(|r| serde_json::from_value(r).ok())
}

fn category_scores(results: &AttemptResults) -> Option<&std::collections::BTreeMap<String, i32>> {
    results
        .personality_traits
        .as_ref()
        .or(results.cognitive_scores.as_ref())
}

impl ExportService {
    /// Union of all category names across the attempts, sorted.
    pub fn category_columns(attempts: &[TestAttempt]) -> Vec<String> {
        let mut names = BTreeSet::new();
        for attempt in attempts {
            if let Some(results) = parsed_results(attempt) {
                if let Some(scores) = category_scores(&results) {
                    names.extend(scores.keys().cloned());
                }
            }
        }
        names.into_iter().collect()
    }

    /// Styled XLSX workbook with one row per attempt of `test`.
    pub fn generate_attempts_xlsx(test: &Test, attempts: &[TestAttempt]) -> Result<Vec<u8>> {
        let categories = Self::category_columns(attempts);
        let column_count = FIXED_COLUMNS.len() + categories.len() + 1;
        let last_col = (column_count - 1) as u16;

        let mut workbook = Workbook::new();
        let worksheet = workbook.add_worksheet();
        worksheet.set_name("Attempts")?;

        let primary_color = Color::RGB(0x1E293B);
        let border_color = Color::RGB(0xE2E8F0);
        let band_high = Color::RGB(0x10B981);
        let band_mid = Color::RGB(0xF59E0B);
        let band_low = Color::RGB(0xEF4444);

        let title_format = Format::new()
            .set_font_size(16)
            .set_bold()
            .set_font_color(Color::White)
            .set_background_color(primary_color)
            .set_align(FormatAlign::CenterAcross)
            .set_align(FormatAlign::VerticalCenter);
        worksheet.set_row_height(0, 32)?;
        worksheet.merge_range(
            0,
            0,
            0,
            last_col,
            &format!("{} ({})", test.name, test.test_type),
            &title_format,
        )?;

        let subtitle_format = Format::new()
            .set_font_size(10)
            .set_italic()
            .set_font_color(Color::RGB(0x94A3B8))
            .set_background_color(primary_color)
            .set_align(FormatAlign::CenterAcross);
        let subtitle = format!(
            "Exported {}  |  {} attempt(s)  |  {} question(s)",
            chrono::Utc::now().format("%Y-%m-%d %H:%M UTC"),
            attempts.len(),
            test.total_questions
        );
        worksheet.merge_range(1, 0, 1, last_col, &subtitle, &subtitle_format)?;

        let header_format = Format::new()
            .set_bold()
            .set_font_color(Color::White)
            .set_background_color(Color::RGB(0x0F172A))
            .set_align(FormatAlign::Center)
            .set_text_wrap()
            .set_border(FormatBorder::Thin)
            .set_border_color(border_color);

        let header_row = 2u32;
        let mut col: u16 = 0;
        for (name, width) in FIXED_COLUMNS {
            worksheet.set_column_width(col, width)?;
            worksheet.write_string_with_format(header_row, col, name, &header_format)?;
            col += 1;
        }
        for category in &categories {
            worksheet.set_column_width(col, 16.0)?;
            worksheet.write_string_with_format(header_row, col, category, &header_format)?;
            col += 1;
        }
        worksheet.set_column_width(col, 70.0)?;
        worksheet.write_string_with_format(header_row, col, "Recommendations", &header_format)?;

        let cell_format = Format::new()
            .set_border(FormatBorder::Thin)
            .set_border_color(border_color)
            .set_text_wrap();
        let band_format = |color: Color| {
            Format::new()
                .set_bold()
                .set_font_color(color)
                .set_border(FormatBorder::Thin)
                .set_border_color(border_color)
        };
        let high_format = band_format(band_high);
        let mid_format = band_format(band_mid);
        let low_format = band_format(band_low);

        for (idx, attempt) in attempts.iter().enumerate() {
            let row = header_row + 1 + idx as u32;
            let results = parsed_results(attempt);

            worksheet.write_number_with_format(row, 0, (idx + 1) as f64, &cell_format)?;
            worksheet.write_string_with_format(row, 1, &attempt.candidate_name, &cell_format)?;
            worksheet.write_string_with_format(row, 2, &attempt.candidate_email, &cell_format)?;
            worksheet.write_string_with_format(row, 3, &attempt.status, &cell_format)?;

            match attempt.total_score {
                Some(score) => worksheet.write_number_with_format(row, 4, score as f64, &cell_format)?,
                None => worksheet.write_string_with_format(row, 4, "-", &cell_format)?,
            };
            match attempt.percentage_score {
                Some(pct) => {
                    let format = match pct {
                        80.. => &high_format,
                        60..=79 => &mid_format,
                        _ => &low_format,
                    };
                    worksheet.write_string_with_format(row, 5, &format!("{}%", pct), format)?
                }
                None => worksheet.write_string_with_format(row, 5, "-", &cell_format)?,
            };
            let completed = attempt
                .completed_at
                .map(|t| t.format("%Y-%m-%d %H:%M").to_string())
                .unwrap_or_else(|| "-".to_string());
            worksheet.write_string_with_format(row, 6, &completed, &cell_format)?;

            let scores = results.as_ref().and_then(category_scores);
            let mut col = FIXED_COLUMNS.len() as u16;
            for category in &categories {
                match scores.and_then(|s| s.get(category)) {
                    Some(v) => worksheet.write_number_with_format(row, col, *v as f64, &cell_format)?,
                    None => worksheet.write_string_with_format(row, col, "-", &cell_format)?,
                };
                col += 1;
            }
            let recommendations = results
                .map(|r| r.recommendations.join("\n"))
                .unwrap_or_default();
            worksheet.write_string_with_format(row, col, &recommendations, &cell_format)?;
        }

        worksheet.set_freeze_panes(header_row + 1, 0)?;

        let buffer = workbook.save_to_buffer()?;
        Ok(buffer)
    }
}

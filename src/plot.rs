use std::fmt::Write;

/// Renders `values` as a `width` x `height` text chart, in order from left to right.
///
/// Values are averaged into one column per character, non-finite ones are skipped. The
/// top and bottom rows are labeled with the largest and smallest plotted value.
pub fn render(values: &[f32], width: usize, height: usize) -> String {
    let finite: Vec<f32> = values.iter().copied().filter(|v| v.is_finite()).collect();
    if finite.is_empty() || width == 0 || height == 0 {
        return String::from("(nothing to plot)\n");
    }

    let width = width.min(finite.len());
    let columns: Vec<f32> = (0..width)
        .map(|c| {
            let start = c * finite.len() / width;
            let end = (c + 1) * finite.len() / width;
            let bucket = &finite[start..end];
            bucket.iter().sum::<f32>() / bucket.len() as f32
        })
        .collect();

    let min = columns.iter().copied().fold(f32::INFINITY, f32::min);
    let max = columns.iter().copied().fold(f32::NEG_INFINITY, f32::max);
    let span = max - min;

    let row_of = |v: f32| {
        if span > 0. {
            ((max - v) / span * (height - 1) as f32).round() as usize
        } else {
            height / 2
        }
    };

    let mut grid = vec![vec![' '; width]; height];
    for (c, &v) in columns.iter().enumerate() {
        grid[row_of(v)][c] = '*';
    }

    let mut out = String::new();
    for (r, row) in grid.iter().enumerate() {
        let label = match r {
            0 => format!("{max:>10.4}"),
            r if r == height - 1 => format!("{min:>10.4}"),
            _ => " ".repeat(10),
        };
        let line: String = row.iter().collect();
        let _ = writeln!(out, "{label} |{}", line.trim_end());
    }
    let _ = writeln!(out, "{} +{}", " ".repeat(10), "-".repeat(width));

    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decreasing_series_goes_from_top_left_to_bottom_right() {
        let chart = render(&[4., 3., 2., 1.], 4, 4);
        let lines: Vec<&str> = chart.lines().collect();

        assert_eq!(lines.len(), 5);
        assert!(lines[0].starts_with("    4.0000 |*"));
        assert!(lines[3].starts_with("    1.0000 |   *"));
        assert!(lines[4].ends_with("+----"));
    }

    #[test]
    fn long_series_are_averaged_into_the_width() {
        let values: Vec<f32> = (0..100).map(|i| i as f32).collect();
        let chart = render(&values, 10, 5);

        assert_eq!(chart.matches('*').count(), 10);
        assert!(chart.lines().last().unwrap().ends_with(&"-".repeat(10)));
    }

    #[test]
    fn non_finite_values_are_skipped() {
        assert_eq!(render(&[f32::NAN], 10, 5), "(nothing to plot)\n");

        let chart = render(&[1., f32::INFINITY, 1.], 10, 3);
        assert_eq!(chart.matches('*').count(), 2);
    }
}

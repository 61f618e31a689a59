//! Reporting sink for finished benchmarks.

/// Receives the final statistics of each benchmark.
///
/// Called exactly once per benchmark, after its iterations are exhausted, in
/// registration order. Non-finite statistics (from fewer than two measured
/// iterations) are passed through as-is; presenting them is up to the
/// reporter.
pub trait Reporter<A> {
    fn report(&mut self, name: &str, iterations: usize, mean: A, std_dev: A);
}

impl<A, F> Reporter<A> for F
where
    F: FnMut(&str, usize, A, A),
{
    fn report(&mut self, name: &str, iterations: usize, mean: A, std_dev: A) {
        self(name, iterations, mean, std_dev)
    }
}

/// Final statistics of one benchmark.
#[derive(Clone, Debug, PartialEq)]
pub struct BenchmarkReport<A> {
    pub name: String,
    pub iterations: usize,
    pub mean: A,
    pub std_dev: A,
}

/// Reporter that keeps every report in memory, in arrival order.
#[derive(Clone, Debug)]
pub struct Collector<A> {
    reports: Vec<BenchmarkReport<A>>,
}

impl<A> Collector<A> {
    pub fn new() -> Self {
        Self {
            reports: Vec::new(),
        }
    }

    pub fn reports(&self) -> &[BenchmarkReport<A>] {
        &self.reports
    }

    pub fn into_reports(self) -> Vec<BenchmarkReport<A>> {
        self.reports
    }
}

impl<A> Default for Collector<A> {
    fn default() -> Self {
        Self::new()
    }
}

impl<A> Reporter<A> for Collector<A> {
    fn report(&mut self, name: &str, iterations: usize, mean: A, std_dev: A) {
        tracing::trace!(benchmark = name, iterations, "collected report");
        self.reports.push(BenchmarkReport {
            name: name.to_string(),
            iterations,
            mean,
            std_dev,
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_collector_keeps_order() {
        let mut collector = Collector::new();
        collector.report("b1", 3, 1.0, 0.5);
        collector.report("b2", 4, 2.0, 0.25);

        let names: Vec<_> = collector.reports().iter().map(|r| r.name.as_str()).collect();
        assert_eq!(names, ["b1", "b2"]);
        assert_eq!(collector.reports()[1].iterations, 4);
    }

    #[test]
    fn test_closure_is_a_reporter() {
        let mut seen = Vec::new();
        {
            let mut reporter = |name: &str, iterations: usize, mean: f64, _sd: f64| {
                seen.push((name.to_string(), iterations, mean));
            };
            Reporter::report(&mut reporter, "closure", 2, 1.5, 0.0);
        }
        assert_eq!(seen, vec![("closure".to_string(), 2, 1.5)]);
    }
}

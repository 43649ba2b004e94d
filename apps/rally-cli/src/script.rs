//! Scripted input for headless drives.
//!
//! A script is a whitespace-separated list of steps: `press:KEY`,
//! `release:KEY` and `wait:SECONDS`. Key names are the ones key bindings use
//! (`w`, `space`, `c`, ...).

use std::fmt;
use std::str::FromStr;

use anyhow::{Context, bail};
use rally_input::KeyId;

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Step {
    Press(KeyId),
    Release(KeyId),
    Wait(f64),
}

impl FromStr for Step {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (verb, arg) = s
            .split_once(':')
            .with_context(|| format!("step {s:?} is not VERB:ARG"))?;
        match verb {
            "press" => Ok(Step::Press(arg.parse()?)),
            "release" => Ok(Step::Release(arg.parse()?)),
            "wait" => {
                let secs: f64 = arg
                    .parse()
                    .with_context(|| format!("bad wait duration {arg:?}"))?;
                if !secs.is_finite() || secs < 0.0 {
                    bail!("wait duration must be a non-negative number, got {arg}");
                }
                Ok(Step::Wait(secs))
            }
            other => bail!("unknown step {other:?}; expected press, release or wait"),
        }
    }
}

impl fmt::Display for Step {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Step::Press(k) => write!(f, "press:{k}"),
            Step::Release(k) => write!(f, "release:{k}"),
            Step::Wait(s) => write!(f, "wait:{s}"),
        }
    }
}

pub fn parse(script: &str) -> anyhow::Result<Vec<Step>> {
    script.split_whitespace().map(str::parse).collect()
}

/// Total simulated time the script asks for.
pub fn duration(steps: &[Step]) -> f64 {
    steps
        .iter()
        .map(|s| match s {
            Step::Wait(secs) => *secs,
            _ => 0.0,
        })
        .sum()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_steps() {
        let steps = parse("press:w wait:1.5 release:W  press:space").unwrap();
        assert_eq!(
            steps,
            vec![
                Step::Press(KeyId::Char('w')),
                Step::Wait(1.5),
                Step::Release(KeyId::Char('w')),
                Step::Press(KeyId::Space),
            ]
        );
        assert_eq!(duration(&steps), 1.5);
    }

    #[test]
    fn rejects_bad_steps() {
        assert!(parse("hold:w").is_err());
        assert!(parse("press").is_err());
        assert!(parse("wait:-1").is_err());
        assert!(parse("wait:soon").is_err());
        assert!(parse("press:shift").is_err());
    }

    #[test]
    fn display_parses_back() {
        for step in parse("press:a wait:0.25 release:a").unwrap() {
            assert_eq!(step.to_string().parse::<Step>().unwrap(), step);
        }
    }
}

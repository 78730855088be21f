use crate::shared::errors::ArbitrageError;
use crate::shared::types::Token;

/// One leg of the route
#[derive(Debug, Clone, Copy)]
pub struct Hop<'a> {
    pub step: u8,
    pub input: &'a Token,
    pub output: &'a Token,
}

impl Hop<'_> {
    pub fn description(&self) -> String {
        format!("{} → {}", self.input.symbol, self.output.symbol)
    }
}

/// Static cycle X → Y → Z → X. Not discovered, configured.
#[derive(Debug, Clone)]
pub struct TriangularRoute {
    tokens: [Token; 3],
}

impl TriangularRoute {
    pub fn new(tokens: [Token; 3]) -> Result<Self, ArbitrageError> {
        for i in 0..3 {
            let next = (i + 1) % 3;
            if tokens[i].mint == tokens[next].mint {
                return Err(ArbitrageError::InvalidRoute(format!(
                    "{} and {} share mint {}",
                    tokens[i].symbol, tokens[next].symbol, tokens[i].mint
                )));
            }
        }
        Ok(Self { tokens })
    }

    pub fn start_token(&self) -> &Token {
        &self.tokens[0]
    }

    pub fn tokens(&self) -> &[Token; 3] {
        &self.tokens
    }

    pub fn hops(&self) -> [Hop<'_>; 3] {
        [0usize, 1, 2].map(|i| Hop {
            step: i as u8 + 1,
            input: &self.tokens[i],
            output: &self.tokens[(i + 1) % 3],
        })
    }

    pub fn description(&self) -> String {
        format!(
            "{} → {} → {} → {}",
            self.tokens[0].symbol, self.tokens[1].symbol, self.tokens[2].symbol, self.tokens[0].symbol
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::default_route;

    #[test]
    fn test_hops_close_the_cycle() {
        let route = default_route();
        let hops = route.hops();
        assert_eq!(hops[0].description(), "SOL → USDT");
        assert_eq!(hops[1].description(), "USDT → USDC");
        assert_eq!(hops[2].description(), "USDC → SOL");
        assert_eq!(hops[2].output.mint, route.start_token().mint);
        assert_eq!(hops[1].step, 2);
        assert_eq!(route.description(), "SOL → USDT → USDC → SOL");
    }

    #[test]
    fn test_repeated_neighbour_rejected() {
        let route = default_route();
        let mut tokens = route.tokens().clone();
        tokens[1] = tokens[0].clone();
        assert!(TriangularRoute::new(tokens).is_err());
    }
}

//! NNUE evaluation network.
//!
//! Architecture: 768 input features (64 squares x 6 piece types x 2
//! colours, perspective-relative), a 128-wide hidden layer of i16
//! accumulators kept incrementally per perspective, and a single output
//! neuron with separate us/them weight vectors. Activation is SCReLU:
//! clamp to `[0, QA]`, then square.

use std::io::{self, Read};

use once_cell::sync::Lazy;

use crate::board::{Byteboard, Color, PieceType, Square};

pub const INPUT_SIZE: usize = 768;
pub const HIDDEN_SIZE: usize = 128;

pub const SCALE: i32 = 400;
pub const QA: i32 = 255;
pub const QB: i32 = 64;

pub type Accumulator = [i16; HIDDEN_SIZE];

/// Weights and biases, loaded from a little-endian i16 blob laid out as
/// accumulator weights `[768][128]`, accumulator biases `[128]`, output
/// weights `[2][128]`, output bias.
pub struct Network {
    pub accumulator_weights: Box<[[i16; HIDDEN_SIZE]; INPUT_SIZE]>,
    pub accumulator_biases: Accumulator,
    pub output_weights: [Accumulator; 2],
    pub output_bias: i16,
}

impl Network {
    /// Parse a network from raw bytes.
    pub fn from_bytes(data: &[u8]) -> io::Result<Self> {
        let mut reader = io::Cursor::new(data);
        Self::from_reader(&mut reader)
    }

    fn from_reader<R: Read>(reader: &mut R) -> io::Result<Self> {
        fn read_i16<R: Read>(reader: &mut R) -> io::Result<i16> {
            let mut buf = [0u8; 2];
            reader.read_exact(&mut buf)?;
            Ok(i16::from_le_bytes(buf))
        }

        let mut accumulator_weights = Box::new([[0i16; HIDDEN_SIZE]; INPUT_SIZE]);
        for row in accumulator_weights.iter_mut() {
            for weight in row.iter_mut() {
                *weight = read_i16(reader)?;
            }
        }

        let mut accumulator_biases = [0i16; HIDDEN_SIZE];
        for bias in &mut accumulator_biases {
            *bias = read_i16(reader)?;
        }

        let mut output_weights = [[0i16; HIDDEN_SIZE]; 2];
        for row in &mut output_weights {
            for weight in row.iter_mut() {
                *weight = read_i16(reader)?;
            }
        }

        let output_bias = read_i16(reader)?;

        Ok(Network {
            accumulator_weights,
            accumulator_biases,
            output_weights,
            output_bias,
        })
    }

    /// A network of all zeroes; evaluates every position to 0.
    #[must_use]
    pub fn zeroed() -> Self {
        Network {
            accumulator_weights: Box::new([[0; HIDDEN_SIZE]; INPUT_SIZE]),
            accumulator_biases: [0; HIDDEN_SIZE],
            output_weights: [[0; HIDDEN_SIZE]; 2],
            output_bias: 0,
        }
    }
}

#[cfg(feature = "embedded_nnue")]
static EMBEDDED_NETWORK: &[u8] = include_bytes!("nets/default.bin");

static DEFAULT_NETWORK: Lazy<Network> = Lazy::new(|| {
    #[cfg(feature = "embedded_nnue")]
    {
        Network::from_bytes(EMBEDDED_NETWORK).expect("embedded network is invalid")
    }
    #[cfg(not(feature = "embedded_nnue"))]
    {
        Network::zeroed()
    }
});

/// The network the engine evaluates with.
#[inline]
#[must_use]
pub fn default_network() -> &'static Network {
    &DEFAULT_NETWORK
}

/// Map the board piece-type encoding onto the network's dense 0-5 range.
const PTYPE_LUT: [usize; 8] = [0, 5, 0, 1, 0, 2, 3, 4];

/// Feature index of a piece seen from one perspective. Black's view flips
/// ranks and swaps ownership so both sides share one weight set.
#[inline]
#[must_use]
pub fn feature_index(perspective: Color, sq: Square, ptype: PieceType, side: Color) -> usize {
    let mut side_index = side.index();
    let mut square_index = sq.index();
    if perspective == Color::Black {
        side_index ^= 1;
        square_index ^= 0b11_1000;
    }
    side_index * 384 + PTYPE_LUT[ptype.index()] * 64 + square_index
}

/// Dual hidden-layer activations, one per perspective, bias-initialised
/// and then updated by adding/subtracting feature columns as pieces move.
#[derive(Clone, Copy, PartialEq, Eq)]
pub struct Accumulators {
    values: [Accumulator; 2],
}

impl Accumulators {
    #[must_use]
    pub fn new(net: &Network) -> Self {
        Accumulators {
            values: [net.accumulator_biases; 2],
        }
    }

    /// Build from a board by accumulating every occupied square.
    #[must_use]
    pub fn from_board(board: &Byteboard, net: &Network) -> Self {
        let mut acc = Accumulators::new(net);
        for idx in 0..64 {
            let sq = Square::from_index(idx);
            let place = board.read(sq);
            if !place.is_empty() {
                acc.add_piece(net, sq, place.ptype(), place.color());
            }
        }
        acc
    }

    #[inline]
    #[must_use]
    pub fn get(&self, color: Color) -> &Accumulator {
        &self.values[color.index()]
    }

    #[inline]
    pub fn add_piece(&mut self, net: &Network, sq: Square, ptype: PieceType, side: Color) {
        let white_feat = feature_index(Color::White, sq, ptype, side);
        let black_feat = feature_index(Color::Black, sq, ptype, side);
        add_weights(&mut self.values[0], &net.accumulator_weights[white_feat]);
        add_weights(&mut self.values[1], &net.accumulator_weights[black_feat]);
    }

    #[inline]
    pub fn remove_piece(&mut self, net: &Network, sq: Square, ptype: PieceType, side: Color) {
        let white_feat = feature_index(Color::White, sq, ptype, side);
        let black_feat = feature_index(Color::Black, sq, ptype, side);
        sub_weights(&mut self.values[0], &net.accumulator_weights[white_feat]);
        sub_weights(&mut self.values[1], &net.accumulator_weights[black_feat]);
    }
}

#[inline]
fn add_weights(acc: &mut Accumulator, weights: &[i16; HIDDEN_SIZE]) {
    for (a, w) in acc.iter_mut().zip(weights) {
        *a = a.wrapping_add(*w);
    }
}

#[inline]
fn sub_weights(acc: &mut Accumulator, weights: &[i16; HIDDEN_SIZE]) {
    for (a, w) in acc.iter_mut().zip(weights) {
        *a = a.wrapping_sub(*w);
    }
}

#[inline]
fn screlu(x: i16) -> i32 {
    let y = i32::from(x).clamp(0, QA);
    y * y
}

/// The output layer: SCReLU over both accumulators, dot with the us/them
/// weight vectors, then dequantise to centipawns.
#[must_use]
pub fn evaluate_accumulators(net: &Network, acc: &Accumulators, stm: Color) -> i32 {
    let us = acc.get(stm);
    let them = acc.get(stm.invert());
    let mut output: i32 = 0;
    for i in 0..HIDDEN_SIZE {
        output += screlu(us[i]) * i32::from(net.output_weights[0][i]);
        output += screlu(them[i]) * i32::from(net.output_weights[1][i]);
    }
    output /= QA;
    output += i32::from(net.output_bias);
    output * SCALE / (QA * QB)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_feature_index_perspective_flip() {
        let sq: Square = "e2".parse().unwrap();
        let white_view = feature_index(Color::White, sq, PieceType::Pawn, Color::White);
        // Own pawn on e2 from white's view == own pawn on e7 from black's view
        let mirrored: Square = "e7".parse().unwrap();
        let black_view = feature_index(Color::Black, mirrored, PieceType::Pawn, Color::Black);
        assert_eq!(white_view, black_view);
        // Friendly pieces occupy the first 384 features
        assert!(white_view < 384);
        let enemy = feature_index(Color::White, sq, PieceType::Pawn, Color::Black);
        assert!(enemy >= 384);
    }

    #[test]
    fn test_feature_index_bounds() {
        for ptype in [
            PieceType::Pawn,
            PieceType::Knight,
            PieceType::Bishop,
            PieceType::Rook,
            PieceType::Queen,
            PieceType::King,
        ] {
            for idx in 0..64 {
                let sq = Square::from_index(idx);
                for perspective in [Color::White, Color::Black] {
                    for side in [Color::White, Color::Black] {
                        assert!(feature_index(perspective, sq, ptype, side) < INPUT_SIZE);
                    }
                }
            }
        }
    }

    #[test]
    fn test_zeroed_network_evaluates_to_zero() {
        let net = Network::zeroed();
        let acc = Accumulators::new(&net);
        assert_eq!(evaluate_accumulators(&net, &acc, Color::White), 0);
    }

    #[test]
    fn test_screlu_clamps_and_squares() {
        assert_eq!(screlu(-100), 0);
        assert_eq!(screlu(10), 100);
        assert_eq!(screlu(i16::MAX), QA * QA);
    }
}

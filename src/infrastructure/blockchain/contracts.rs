//! ABI definitions for the token, router and factory contracts

use alloy_sol_types::sol;

sol! {
    interface IERC20 {
        function allowance(address owner, address spender) external view returns (uint256);
        function approve(address spender, uint256 amount) external returns (bool);
        function balanceOf(address owner) external view returns (uint256);
    }
}

sol! {
    interface IPoolRouter {
        function addLiquidity(
            address tokenA,
            address tokenB,
            uint256 amountADesired,
            uint256 amountBDesired,
            uint256 amountAMin,
            uint256 amountBMin,
            address to
        ) external returns (uint256 amountA, uint256 amountB, uint256 liquidity);

        function getAmountOut(uint256 amountIn, address tokenIn, address tokenOut)
            external view returns (uint256);

        function swapExactTokensForTokens(
            uint256 amountIn,
            uint256 amountOutMin,
            address[] calldata path,
            address to
        ) external;

        function removeLiquidity(
            address tokenA,
            address tokenB,
            uint256 liquidity,
            uint256 amountAMin,
            uint256 amountBMin,
            address to,
            uint256 deadline
        ) external returns (uint256 amountA, uint256 amountB);
    }
}

sol! {
    interface IPairFactory {
        function getPair(address tokenA, address tokenB) external view returns (address pair);
    }
}

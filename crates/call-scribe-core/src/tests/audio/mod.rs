mod resampler;
